//! Poll-driven fetch lifecycle for interactive views.
//!
//! A [`Fetch`] walks one collection through idle, loading, ready, and
//! failed states. Results arrive over a channel, so callers poll from an
//! event loop tick instead of awaiting. One load can produce two ready
//! states in a row: the cached payload first, then the revalidated one
//! once the endpoint has answered.

use serde_json::Value;
use tokio::sync::mpsc;

use crate::content::Collection;
use crate::store::Source;
use crate::sync::{LoadMode, SyncController, SyncError};

/// The state of a fetch
#[derive(Debug, Clone)]
pub enum FetchState {
  /// Fetch has not been started
  Idle,
  /// Fetch is in flight
  Loading,
  /// A payload is available
  Ready(Value),
  /// The load failed and no fallback could cover for it
  Failed(SyncError),
}

impl FetchState {
  pub fn is_loading(&self) -> bool {
    matches!(self, FetchState::Loading)
  }

  pub fn is_ready(&self) -> bool {
    matches!(self, FetchState::Ready(_))
  }

  pub fn is_failed(&self) -> bool {
    matches!(self, FetchState::Failed(_))
  }

  pub fn payload(&self) -> Option<&Value> {
    match self {
      FetchState::Ready(payload) => Some(payload),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&SyncError> {
    match self {
      FetchState::Failed(e) => Some(e),
      _ => None,
    }
  }
}

enum Update {
  Ready { payload: Value, source: Source },
  Failed(SyncError),
}

/// Fetch state machine for a single collection.
///
/// Wraps a [`SyncController`] load so interactive callers get:
/// - an immediate ready state when the store already holds a fresh entry,
///   with the revalidated payload following as a second update
/// - the last good payload retained across refreshes and failures
/// - async result handling via channels
pub struct Fetch {
  controller: SyncController,
  collection: Collection,
  mode: LoadMode,
  state: FetchState,
  last_good: Option<Value>,
  source: Option<Source>,
  receiver: Option<mpsc::UnboundedReceiver<Update>>,
}

impl Fetch {
  pub fn new(controller: SyncController, collection: Collection, mode: LoadMode) -> Self {
    Self {
      controller,
      collection,
      mode,
      state: FetchState::Idle,
      last_good: None,
      source: None,
      receiver: None,
    }
  }

  /// Get the current state of the fetch.
  pub fn state(&self) -> &FetchState {
    &self.state
  }

  /// The most recent usable payload: the current one when ready, otherwise
  /// the last good payload from before a refresh or failure.
  pub fn data(&self) -> Option<&Value> {
    self.state.payload().or(self.last_good.as_ref())
  }

  /// Where the current payload came from.
  pub fn source(&self) -> Option<Source> {
    self.source
  }

  pub fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  /// Start loading if not already in flight.
  ///
  /// A fresh stored entry is applied synchronously, so callers see a ready
  /// state with no loading flash; revalidation then runs behind it and is
  /// delivered through [`Fetch::poll`].
  pub fn load(&mut self) {
    if self.state.is_loading() {
      return;
    }

    if self.mode == LoadMode::CacheFirst {
      if let Some(entry) = self.controller.peek_fresh(self.collection) {
        self.apply_ready(entry.payload, Source::CacheFresh);
        self.start(LoadMode::CacheFirst);
        return;
      }
    }

    self.state = FetchState::Loading;
    self.start(self.mode);
  }

  /// Force a reload. Live fetches stay live; anything else escalates to a
  /// cache-busting refresh.
  pub fn refresh(&mut self) {
    // Drop the receiver so a pending load cannot deliver over the refresh.
    self.receiver = None;
    self.state = FetchState::Loading;
    let mode = match self.mode {
      LoadMode::Live => LoadMode::Live,
      _ => LoadMode::Refresh,
    };
    self.start(mode);
  }

  /// Poll for updates from a pending load.
  ///
  /// Drains everything queued and returns `true` if the state changed.
  /// Call this in your event loop tick handler.
  pub fn poll(&mut self) -> bool {
    let mut changed = false;
    loop {
      // Re-borrow each round; the arms below need the rest of self.
      let Some(receiver) = &mut self.receiver else {
        break;
      };
      match receiver.try_recv() {
        Ok(Update::Ready { payload, source }) => {
          self.apply_ready(payload, source);
          changed = true;
        }
        Ok(Update::Failed(e)) => {
          self.state = FetchState::Failed(e);
          changed = true;
        }
        Err(mpsc::error::TryRecvError::Empty) => break,
        Err(mpsc::error::TryRecvError::Disconnected) => {
          // Sender gone without a result means the task was torn down.
          if self.state.is_loading() {
            self.state = FetchState::Failed(SyncError::Interrupted);
            changed = true;
          }
          self.receiver = None;
          break;
        }
      }
    }

    changed
  }

  fn apply_ready(&mut self, payload: Value, source: Source) {
    self.last_good = Some(payload.clone());
    self.source = Some(source);
    self.state = FetchState::Ready(payload);
  }

  fn start(&mut self, mode: LoadMode) {
    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);

    let controller = self.controller.clone();
    let collection = self.collection;
    tokio::spawn(async move {
      // Ignore send errors - receiver may have been dropped
      match controller.load(collection, mode).await {
        Ok(loaded) => {
          let _ = tx.send(Update::Ready {
            payload: loaded.payload,
            source: loaded.source,
          });
          if let Some(handle) = loaded.revalidation {
            if let Ok(Some(payload)) = handle.await {
              let _ = tx.send(Update::Ready {
                payload,
                source: Source::Network,
              });
            }
          }
        }
        Err(e) => {
          let _ = tx.send(Update::Failed(e));
        }
      }
    });
  }
}

impl std::fmt::Debug for Fetch {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Fetch")
      .field("collection", &self.collection)
      .field("mode", &self.mode)
      .field("state", &self.state)
      .field("source", &self.source)
      .finish_non_exhaustive()
  }
}
