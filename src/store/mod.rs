pub mod entry;
pub mod storage;

pub use entry::{CacheEntry, Source};
#[cfg(test)]
pub use storage::MemoryStore;
pub use storage::{CollectionStore, NoopStore, SqliteStore};
