//! Collection store trait and its SQLite, in-memory, and no-op backends.

use rusqlite::{params, Connection};
use serde_json::Value;
#[cfg(test)]
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

use crate::content::Collection;

use super::entry::CacheEntry;

/// Prefix for every persisted key; the collection wire name follows it.
pub const KEY_PREFIX: &str = "content_cache_";

fn cache_key(collection: Collection) -> String {
  format!("{KEY_PREFIX}{}", collection.as_name())
}

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("cache database error: {0}")]
  Database(#[from] rusqlite::Error),
  #[error("cache entry serialization failed: {0}")]
  Serialize(#[from] serde_json::Error),
  #[error("failed to create cache directory: {0}")]
  Io(#[from] std::io::Error),
  #[error("could not determine a data directory for the cache")]
  NoDataDir,
}

/// Durable, per-collection persistence of the most recent payload.
///
/// One entry per collection, last write wins, no merge semantics. Freshness
/// is not evaluated here; that is the caller's policy decision via
/// [`CacheEntry::is_fresh`].
pub trait CollectionStore: Send + Sync {
  /// The stored entry, or `None` when absent. A corrupt or unparsable
  /// persisted value also reads as `None`: corruption must never reach the
  /// caller as an error.
  fn read(&self, collection: Collection) -> Option<CacheEntry>;

  /// Store `payload` stamped with the current time, overwriting any prior
  /// entry. Payload validation (non-emptiness) is the caller's job.
  fn write(&self, collection: Collection, payload: Value) -> Result<(), StoreError>;

  /// Remove the entry for `collection`. Idempotent.
  fn invalidate(&self, collection: Collection) -> Result<(), StoreError>;
}

/// Store that never retains anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStore;

impl CollectionStore for NoopStore {
  fn read(&self, _collection: Collection) -> Option<CacheEntry> {
    None // Always miss
  }

  fn write(&self, _collection: Collection, _payload: Value) -> Result<(), StoreError> {
    Ok(()) // Discard
  }

  fn invalidate(&self, _collection: Collection) -> Result<(), StoreError> {
    Ok(())
  }
}

/// In-memory store for tests.
///
/// Values are held in the same serialized layout the durable store writes,
/// so both backends exercise the identical encoding.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStore {
  entries: Mutex<HashMap<String, String>>,
}

#[cfg(test)]
impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[cfg(test)]
impl CollectionStore for MemoryStore {
  fn read(&self, collection: Collection) -> Option<CacheEntry> {
    let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
    let raw = entries.get(&cache_key(collection))?;
    decode_entry(collection, raw)
  }

  fn write(&self, collection: Collection, payload: Value) -> Result<(), StoreError> {
    let encoded = serde_json::to_string(&CacheEntry::new(payload))?;
    let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
    entries.insert(cache_key(collection), encoded);
    Ok(())
  }

  fn invalidate(&self, collection: Collection) -> Result<(), StoreError> {
    let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
    entries.remove(&cache_key(collection));
    Ok(())
  }
}

/// SQLite-backed store: one `content_cache` row per collection.
pub struct SqliteStore {
  conn: Mutex<Connection>,
}

impl SqliteStore {
  /// Open the store at the default location.
  pub fn open() -> Result<Self, StoreError> {
    Self::open_at(&Self::default_path()?)
  }

  /// Open the store at an explicit path, creating parent directories and
  /// the schema as needed.
  pub fn open_at(path: &Path) -> Result<Self, StoreError> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(path)?;
    conn.execute_batch(SCHEMA)?;

    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  /// Default database path.
  fn default_path() -> Result<PathBuf, StoreError> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or(StoreError::NoDataDir)?;

    Ok(data_dir.join("foliosync").join("cache.db"))
  }

  fn conn(&self) -> MutexGuard<'_, Connection> {
    // A poisoned lock still guards a usable connection.
    self.conn.lock().unwrap_or_else(|e| e.into_inner())
  }
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS content_cache (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

impl CollectionStore for SqliteStore {
  fn read(&self, collection: Collection) -> Option<CacheEntry> {
    let conn = self.conn();
    let raw: String = conn
      .query_row(
        "SELECT value FROM content_cache WHERE key = ?",
        params![cache_key(collection)],
        |row| row.get(0),
      )
      .ok()?;

    decode_entry(collection, &raw)
  }

  fn write(&self, collection: Collection, payload: Value) -> Result<(), StoreError> {
    let encoded = serde_json::to_string(&CacheEntry::new(payload))?;

    let conn = self.conn();
    conn.execute(
      "INSERT OR REPLACE INTO content_cache (key, value) VALUES (?, ?)",
      params![cache_key(collection), encoded],
    )?;

    Ok(())
  }

  fn invalidate(&self, collection: Collection) -> Result<(), StoreError> {
    let conn = self.conn();
    conn.execute(
      "DELETE FROM content_cache WHERE key = ?",
      params![cache_key(collection)],
    )?;

    Ok(())
  }
}

fn decode_entry(collection: Collection, raw: &str) -> Option<CacheEntry> {
  match serde_json::from_str(raw) {
    Ok(entry) => Some(entry),
    Err(e) => {
      tracing::debug!(collection = %collection, "discarding unreadable cache entry: {e}");
      None
    }
  }
}
