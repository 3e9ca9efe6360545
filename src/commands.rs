//! Handlers for the CLI subcommands.
//!
//! Payloads go to stdout so they can be piped; progress and source notes
//! go to stderr.

use chrono::Utc;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use futures::future;
use serde_json::Value;

use crate::content::Collection;
use crate::fetch::{Fetch, FetchState};
use crate::store::CollectionStore;
use crate::sync::{LoadMode, Loaded, SyncController};

/// Print a collection, serving cached data when it is fresh.
///
/// When the payload came out of the store, the background revalidation is
/// awaited before exit so a one-shot run still lands the newer payload in
/// the cache. Its outcome is not printed.
pub async fn show(controller: &SyncController, collection: Collection) -> Result<()> {
  let loaded = controller.load(collection, LoadMode::CacheFirst).await?;

  describe(collection, &loaded);
  println!("{}", serde_json::to_string_pretty(&loaded.payload)?);

  if let Some(handle) = loaded.revalidation {
    let _ = handle.await;
  }

  Ok(())
}

/// Refetch collections past intermediary caches and overwrite the store.
///
/// Reports per collection and fails if any collection could not be synced.
pub async fn sync(controller: &SyncController, collection: Option<Collection>) -> Result<()> {
  let targets: Vec<Collection> = match collection {
    Some(c) => vec![c],
    None => Collection::NAMED.to_vec(),
  };

  let results = future::join_all(targets.iter().map(|&c| controller.refresh(c))).await;

  let mut failures = 0;
  for (&target, result) in targets.iter().zip(results) {
    match result {
      Ok(loaded) => {
        eprintln!(
          "{target}: {} items ({})",
          item_count(&loaded.payload),
          loaded.source.label()
        );
      }
      Err(e) => {
        failures += 1;
        eprintln!("{target}: {e}");
      }
    }
  }

  if failures > 0 {
    return Err(eyre!("{failures} collection(s) failed to sync"));
  }

  Ok(())
}

/// Fetch a collection live and print exactly what the endpoint returned,
/// empty or not. The cache stays untouched.
pub async fn browse(controller: &SyncController, collection: Collection) -> Result<()> {
  let loaded = controller.load(collection, LoadMode::Live).await?;
  println!("{}", serde_json::to_string_pretty(&loaded.payload)?);
  Ok(())
}

/// Poll a collection on an interval, printing each state change.
pub async fn watch(controller: SyncController, collection: Collection, interval: u64) -> Result<()> {
  let mut fetch = Fetch::new(controller, collection, LoadMode::CacheFirst);
  fetch.load();
  report(collection, &fetch);

  let mut tick = tokio::time::interval(std::time::Duration::from_millis(250));
  let mut reload = tokio::time::interval(std::time::Duration::from_secs(interval.max(1)));
  // An interval fires immediately; swallow that first tick so the initial
  // load is not doubled by a refresh.
  reload.tick().await;

  loop {
    tokio::select! {
      _ = tokio::signal::ctrl_c() => break,
      _ = reload.tick() => fetch.refresh(),
      _ = tick.tick() => {
        if fetch.poll() {
          report(collection, &fetch);
        }
      }
    }
  }

  Ok(())
}

/// Show what is cached and how old it is.
pub fn cache_status(store: &dyn CollectionStore, max_age: chrono::Duration) -> Result<()> {
  for collection in all_collections() {
    match store.read(collection) {
      Some(entry) => {
        let state = if entry.is_fresh(max_age) { "fresh" } else { "stale" };
        println!(
          "{collection}: {} items, fetched {} ({state})",
          item_count(&entry.payload),
          describe_age(entry.age())
        );
      }
      None => println!("{collection}: empty"),
    }
  }

  Ok(())
}

/// Drop cached entries for one collection, or for all of them.
pub fn cache_clear(store: &dyn CollectionStore, collection: Option<Collection>) -> Result<()> {
  let targets: Vec<Collection> = match collection {
    Some(c) => vec![c],
    None => all_collections().collect(),
  };

  for target in targets {
    store.invalidate(target)?;
    eprintln!("{target}: cleared");
  }

  Ok(())
}

fn all_collections() -> impl Iterator<Item = Collection> {
  Collection::NAMED.into_iter().chain([Collection::All])
}

fn describe(collection: Collection, loaded: &Loaded) {
  match loaded.fetched_at {
    Some(fetched_at) => eprintln!(
      "{collection}: {} items ({}, fetched {})",
      item_count(&loaded.payload),
      loaded.source.label(),
      describe_age(Utc::now() - fetched_at)
    ),
    None => eprintln!(
      "{collection}: {} items ({})",
      item_count(&loaded.payload),
      loaded.source.label()
    ),
  }
}

fn report(collection: Collection, fetch: &Fetch) {
  match fetch.state() {
    FetchState::Idle => {}
    FetchState::Loading => eprintln!("{collection}: loading..."),
    FetchState::Ready(payload) => {
      let source = fetch.source().map(|s| s.label()).unwrap_or("unknown");
      println!("{collection}: {} items ({source})", item_count(payload));
    }
    FetchState::Failed(e) => match fetch.data() {
      Some(payload) => eprintln!(
        "{collection}: {e} (still holding {} items)",
        item_count(payload)
      ),
      None => eprintln!("{collection}: {e}"),
    },
  }
}

/// Item count for display. Arrays count their elements; assembled objects
/// count the elements of each member collection.
fn item_count(payload: &Value) -> usize {
  match payload {
    Value::Array(items) => items.len(),
    Value::Object(map) => map
      .values()
      .map(|v| v.as_array().map_or(1, |items| items.len()))
      .sum(),
    _ => 0,
  }
}

fn describe_age(age: chrono::Duration) -> String {
  if age.num_hours() > 0 {
    format!("{}h ago", age.num_hours())
  } else {
    format!("{}m ago", age.num_minutes().max(0))
  }
}
