//! Content domain: collection names, the remote endpoint client, and
//! bundled fallback documents.

pub mod client;
pub mod fallback;
pub mod types;

pub use client::{FetchError, RemoteClient};
pub use types::Collection;
