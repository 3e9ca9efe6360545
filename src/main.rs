mod commands;
mod config;
mod content;
mod fetch;
mod store;
mod sync;
#[cfg(test)]
mod testutil;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use content::{Collection, RemoteClient};
use store::{CollectionStore, NoopStore, SqliteStore};
use sync::SyncController;

#[derive(Parser, Debug)]
#[command(name = "foliosync")]
#[command(about = "Content sync and inspection tool for a spreadsheet-backed portfolio site")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/foliosync/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Print a collection, serving cached data when it is fresh
  Show {
    /// Collection name: blog, project, skill, innovation, or all
    #[arg(value_parser = parse_collection)]
    collection: Collection,
  },
  /// Refetch collections from the endpoint and overwrite the cache
  Sync {
    /// Collection to sync (default: every collection)
    #[arg(value_parser = parse_collection)]
    collection: Option<Collection>,
  },
  /// Fetch a collection live, bypassing the cache entirely
  Browse {
    /// Collection name: blog, project, skill, innovation, or all
    #[arg(value_parser = parse_collection)]
    collection: Collection,
  },
  /// Poll a collection and print updates as they arrive
  Watch {
    /// Collection name: blog, project, skill, innovation, or all
    #[arg(value_parser = parse_collection)]
    collection: Collection,
    /// Seconds between reloads
    #[arg(long, default_value_t = 30)]
    interval: u64,
  },
  /// Inspect or clear the local cache
  Cache {
    #[command(subcommand)]
    action: CacheAction,
  },
}

#[derive(Subcommand, Debug)]
enum CacheAction {
  /// Show what is cached and how old it is
  Status,
  /// Drop cached entries
  Clear {
    /// Collection to clear (default: every collection)
    #[arg(value_parser = parse_collection)]
    collection: Option<Collection>,
  },
}

fn parse_collection(s: &str) -> Result<Collection, String> {
  Collection::from_name(s).ok_or_else(|| {
    format!("unknown collection '{s}' (expected blog, project, skill, innovation, or all)")
  })
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();

  let config = config::Config::load(args.config.as_deref())?;

  let store: Arc<dyn CollectionStore> = if config.cache.enabled {
    let store = match &config.cache.path {
      Some(path) => SqliteStore::open_at(path)?,
      None => SqliteStore::open()?,
    };
    Arc::new(store)
  } else {
    Arc::new(NoopStore)
  };

  let client = match config.endpoint_url() {
    Some(url) => Some(RemoteClient::new(&url, config.request_timeout())?),
    None => None,
  };

  let controller = SyncController::new(store.clone(), client, config.max_age());

  match args.command {
    Command::Show { collection } => commands::show(&controller, collection).await,
    Command::Sync { collection } => commands::sync(&controller, collection).await,
    Command::Browse { collection } => commands::browse(&controller, collection).await,
    Command::Watch {
      collection,
      interval,
    } => commands::watch(controller, collection, interval).await,
    Command::Cache { action } => match action {
      CacheAction::Status => commands::cache_status(store.as_ref(), config.max_age()),
      CacheAction::Clear { collection } => commands::cache_clear(store.as_ref(), collection),
    },
  }
}
