//! Collection names and payload shape rules.
//!
//! Payload schemas are opaque to this layer: items stay `serde_json::Value`
//! all the way through. The only shape knowledge lives here: which
//! collections exist, how a remote response maps to a payload, and what
//! counts as "no usable data".

use serde_json::Value;
use std::fmt;

/// A logical content set served by the remote endpoint.
///
/// The wire name doubles as the `type` query parameter and as the cache key
/// suffix. `All` is a sentinel: the endpoint answers with an object keyed by
/// collection name instead of a single array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
  Blog,
  Project,
  Skill,
  Innovation,
  All,
}

impl Collection {
  /// The named (non-sentinel) collections, in display order.
  pub const NAMED: [Collection; 4] = [
    Collection::Blog,
    Collection::Project,
    Collection::Skill,
    Collection::Innovation,
  ];

  pub fn as_name(self) -> &'static str {
    match self {
      Collection::Blog => "blog",
      Collection::Project => "project",
      Collection::Skill => "skill",
      Collection::Innovation => "innovation",
      Collection::All => "all",
    }
  }

  pub fn from_name(name: &str) -> Option<Self> {
    match name.trim().to_lowercase().as_str() {
      "blog" => Some(Collection::Blog),
      "project" => Some(Collection::Project),
      "skill" => Some(Collection::Skill),
      "innovation" => Some(Collection::Innovation),
      "all" => Some(Collection::All),
      _ => None,
    }
  }
}

impl fmt::Display for Collection {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_name())
  }
}

/// Whether a payload carries usable data.
///
/// An empty array, empty object, null, or a stray scalar is "no usable
/// data": it must never overwrite a cache entry or replace non-empty
/// fallback content.
pub fn is_usable(payload: &Value) -> bool {
  match payload {
    Value::Array(items) => !items.is_empty(),
    Value::Object(map) => !map.is_empty(),
    _ => false,
  }
}

/// Normalize a decoded response body into the payload for `collection`.
///
/// `All` keeps the whole decoded object unmodified. A named collection is
/// extracted from an object body by its wire name (absent key yields an
/// empty array); a bare array body is already the payload. The endpoint has
/// answered in both shapes over time, so both are accepted.
pub fn extract_payload(collection: Collection, decoded: Value) -> Value {
  if collection == Collection::All {
    return decoded;
  }
  match decoded {
    Value::Object(mut map) => map
      .remove(collection.as_name())
      .unwrap_or_else(|| Value::Array(Vec::new())),
    array @ Value::Array(_) => array,
    _ => Value::Array(Vec::new()),
  }
}
