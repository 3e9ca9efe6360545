//! Cache entry layout, freshness, and payload provenance.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One persisted payload for one collection.
///
/// The collection lives in the storage key; the stored value is exactly
/// `{"timestamp": <epoch-ms>, "payload": <array|object>}` so other readers
/// of the store (and older snapshots of it) stay compatible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
  #[serde(rename = "timestamp", with = "chrono::serde::ts_milliseconds")]
  pub fetched_at: DateTime<Utc>,
  pub payload: Value,
}

impl CacheEntry {
  /// Entry stamped now. All writes go through this, which keeps
  /// `fetched_at` non-decreasing per collection under last-write-wins.
  pub fn new(payload: Value) -> Self {
    Self {
      fetched_at: Utc::now(),
      payload,
    }
  }

  /// Strict freshness: true iff `now - fetched_at < max_age`. An entry
  /// sitting exactly on the window boundary is already stale.
  pub fn is_fresh(&self, max_age: Duration) -> bool {
    Utc::now() - self.fetched_at < max_age
  }

  pub fn age(&self) -> Duration {
    Utc::now() - self.fetched_at
  }
}

/// Where a served payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
  /// Fresh data from the endpoint
  Network,
  /// Cached data inside the freshness window
  CacheFresh,
  /// Cached data served because the endpoint gave nothing usable
  Offline,
  /// Bundled fallback document
  Bundled,
}

impl Source {
  pub fn label(self) -> &'static str {
    match self {
      Source::Network => "network",
      Source::CacheFresh => "cache",
      Source::Offline => "cache (stale)",
      Source::Bundled => "bundled",
    }
  }
}
