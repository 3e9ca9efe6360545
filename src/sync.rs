//! Load orchestration across the remote endpoint, the collection store,
//! and the bundled fallback documents.
//!
//! Strategy is cache-first: a fresh stored entry is served immediately and
//! revalidated in the background, a miss goes to the network, and anything
//! that fails falls back to stale data and then to the bundled documents.

use chrono::{DateTime, Duration, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::content::types::is_usable;
use crate::content::{fallback, Collection, FetchError, RemoteClient};
use crate::store::{CacheEntry, CollectionStore, Source};

#[derive(Debug, Clone, Error)]
pub enum SyncError {
  #[error(transparent)]
  Fetch(#[from] FetchError),
  #[error("no remote endpoint configured")]
  Unconfigured,
  #[error("no cached or bundled data available")]
  NoData,
  #[error("fetch task was interrupted")]
  Interrupted,
}

/// How a load interacts with the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
  /// Serve a fresh stored entry immediately and revalidate in the
  /// background; on a miss fetch from the network, recovering through
  /// stale and bundled data when that fails.
  CacheFirst,
  /// Fetch with the cache buster and overwrite the stored entry. Errors
  /// surface to the caller; an empty response recovers without touching
  /// the stored entry.
  Refresh,
  /// Fetch with the cache buster and hand the payload through untouched.
  /// The store is neither read nor written.
  Live,
}

/// A successfully loaded payload and where it came from.
#[derive(Debug)]
pub struct Loaded {
  pub payload: Value,
  pub source: Source,
  /// When the payload was originally fetched. `None` for payloads straight
  /// off the network or from the bundled documents.
  pub fetched_at: Option<DateTime<Utc>>,
  /// Background revalidation behind a fresh cache hit. The task resolves
  /// to the replacement payload when the store was updated.
  pub revalidation: Option<JoinHandle<Option<Value>>>,
}

type SharedFetch = Shared<BoxFuture<'static, Result<Value, FetchError>>>;

/// Cache-first loader for remote collections.
///
/// Cloning is cheap and clones share the store and the in-flight request
/// map, so concurrent loads of the same collection collapse into a single
/// network request.
#[derive(Clone)]
pub struct SyncController {
  store: Arc<dyn CollectionStore>,
  client: Option<RemoteClient>,
  max_age: Duration,
  in_flight: Arc<Mutex<HashMap<Collection, SharedFetch>>>,
}

impl SyncController {
  pub fn new(store: Arc<dyn CollectionStore>, client: Option<RemoteClient>, max_age: Duration) -> Self {
    Self {
      store,
      client,
      max_age,
      in_flight: Arc::new(Mutex::new(HashMap::new())),
    }
  }

  /// The stored entry for `collection`, provided it is still fresh.
  pub fn peek_fresh(&self, collection: Collection) -> Option<CacheEntry> {
    self
      .store
      .read(collection)
      .filter(|entry| entry.is_fresh(self.max_age))
  }

  /// Load `collection` according to `mode`.
  pub async fn load(&self, collection: Collection, mode: LoadMode) -> Result<Loaded, SyncError> {
    match mode {
      LoadMode::CacheFirst => self.load_cache_first(collection).await,
      LoadMode::Refresh => self.refresh(collection).await,
      LoadMode::Live => self.load_live(collection).await,
    }
  }

  /// Imperative refresh: fetch past intermediary caches and overwrite the
  /// stored entry with the result. Unlike a cache-first load, fetch errors
  /// surface to the caller so a deliberate sync can report failure. The
  /// stored entry is only replaced by usable data, never destroyed by an
  /// empty or failed response.
  pub async fn refresh(&self, collection: Collection) -> Result<Loaded, SyncError> {
    let client = self.client.as_ref().ok_or(SyncError::Unconfigured)?;

    let payload = client.fetch(collection, true).await?;
    if is_usable(&payload) {
      self.persist(collection, &payload);
      return Ok(Loaded {
        payload,
        source: Source::Network,
        fetched_at: None,
        revalidation: None,
      });
    }

    tracing::warn!(collection = %collection, "refresh returned no usable data");
    self.recover(collection, None)
  }

  async fn load_cache_first(&self, collection: Collection) -> Result<Loaded, SyncError> {
    if let Some(entry) = self.peek_fresh(collection) {
      tracing::debug!(collection = %collection, "serving fresh cache entry");
      let revalidation = self
        .client
        .is_some()
        .then(|| self.spawn_revalidate(collection));
      return Ok(Loaded {
        payload: entry.payload,
        source: Source::CacheFresh,
        fetched_at: Some(entry.fetched_at),
        revalidation,
      });
    }

    let Some(client) = self.client.clone() else {
      return self.recover(collection, None);
    };

    match self.fetch_coalesced(client, collection).await {
      Ok(payload) if is_usable(&payload) => {
        self.persist(collection, &payload);
        Ok(Loaded {
          payload,
          source: Source::Network,
          fetched_at: None,
          revalidation: None,
        })
      }
      Ok(_) => {
        tracing::warn!(collection = %collection, "endpoint returned no usable data");
        self.recover(collection, None)
      }
      Err(e) => {
        tracing::warn!(collection = %collection, "fetch failed: {e}");
        self.recover(collection, Some(e))
      }
    }
  }

  async fn load_live(&self, collection: Collection) -> Result<Loaded, SyncError> {
    let client = self.client.as_ref().ok_or(SyncError::Unconfigured)?;

    // Live views show exactly what the endpoint returned, empty or not.
    let payload = client.fetch(collection, true).await?;
    Ok(Loaded {
      payload,
      source: Source::Network,
      fetched_at: None,
      revalidation: None,
    })
  }

  /// Revalidate a served cache entry against the endpoint. Returns the new
  /// payload when the store was updated; failures keep the stored entry
  /// and are logged only.
  async fn revalidate(&self, collection: Collection) -> Option<Value> {
    let client = self.client.clone()?;

    match self.fetch_coalesced(client, collection).await {
      Ok(payload) if is_usable(&payload) => {
        self.persist(collection, &payload);
        Some(payload)
      }
      Ok(_) => {
        tracing::debug!(collection = %collection, "revalidation returned no usable data");
        None
      }
      Err(e) => {
        tracing::debug!(collection = %collection, "revalidation failed: {e}");
        None
      }
    }
  }

  fn spawn_revalidate(&self, collection: Collection) -> JoinHandle<Option<Value>> {
    let controller = self.clone();
    tokio::spawn(async move { controller.revalidate(collection).await })
  }

  /// Fetch through the in-flight map so concurrent loads of the same
  /// collection share one network request.
  async fn fetch_coalesced(
    &self,
    client: RemoteClient,
    collection: Collection,
  ) -> Result<Value, FetchError> {
    let fut = {
      let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
      match in_flight.get(&collection) {
        Some(existing) => existing.clone(),
        None => {
          let fut: SharedFetch = async move { client.fetch(collection, false).await }
            .boxed()
            .shared();
          in_flight.insert(collection, fut.clone());
          fut
        }
      }
    };

    let result = fut.clone().await;

    // Only the future we awaited may be evicted; a later load may already
    // have installed a replacement.
    let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
    if in_flight.get(&collection).is_some_and(|f| f.ptr_eq(&fut)) {
      in_flight.remove(&collection);
    }

    result
  }

  fn persist(&self, collection: Collection, payload: &Value) {
    if let Err(e) = self.store.write(collection, payload.clone()) {
      tracing::warn!(collection = %collection, "failed to persist payload: {e}");
    }
  }

  /// Recovery chain for a load that produced no usable network data: any
  /// stored entry first, the bundled documents second.
  fn recover(&self, collection: Collection, cause: Option<FetchError>) -> Result<Loaded, SyncError> {
    if let Some(entry) = self.store.read(collection) {
      let source = if entry.is_fresh(self.max_age) {
        Source::CacheFresh
      } else {
        Source::Offline
      };
      tracing::info!(collection = %collection, source = source.label(), "serving stored entry");
      return Ok(Loaded {
        payload: entry.payload,
        source,
        fetched_at: Some(entry.fetched_at),
        revalidation: None,
      });
    }

    let bundled = fallback::payload(collection);
    if is_usable(&bundled) {
      tracing::info!(collection = %collection, "serving bundled fallback");
      return Ok(Loaded {
        payload: bundled,
        source: Source::Bundled,
        fetched_at: None,
        revalidation: None,
      });
    }

    Err(cause.map(SyncError::Fetch).unwrap_or(SyncError::NoData))
  }
}
