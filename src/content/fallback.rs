//! Bundled fallback content.
//!
//! The publish pipeline snapshots each collection into a static JSON
//! document; those documents ship inside the binary and serve when the
//! endpoint is unconfigured or gives nothing usable. Each document wraps
//! its items in a collection-specific envelope key (skills alone are a
//! bare array), so the whole unwrap policy is the one table below.

use serde_json::{Map, Value};

use super::types::Collection;

const BLOG: &str = include_str!("../../data/blog.json");
const PROJECTS: &str = include_str!("../../data/projects.json");
const SKILLS: &str = include_str!("../../data/skills.json");
const INNOVATION: &str = include_str!("../../data/innovation.json");

/// Envelope key wrapping each bundled document's items.
fn envelope_key(collection: Collection) -> Option<&'static str> {
  match collection {
    Collection::Blog => Some("posts"),
    Collection::Project => Some("projects"),
    Collection::Innovation => Some("items"),
    Collection::Skill | Collection::All => None,
  }
}

fn document(collection: Collection) -> Option<&'static str> {
  match collection {
    Collection::Blog => Some(BLOG),
    Collection::Project => Some(PROJECTS),
    Collection::Skill => Some(SKILLS),
    Collection::Innovation => Some(INNOVATION),
    Collection::All => None,
  }
}

/// The bundled payload for `collection`, normalized to the remote shape.
///
/// Named collections yield their unwrapped item array; `All` assembles an
/// object keyed by wire name, matching a `type=all` response. A document
/// that fails to decode yields an empty array rather than an error.
pub fn payload(collection: Collection) -> Value {
  if collection == Collection::All {
    let mut map = Map::new();
    for named in Collection::NAMED {
      map.insert(named.as_name().to_string(), payload(named));
    }
    return Value::Object(map);
  }

  let Some(raw) = document(collection) else {
    return Value::Array(Vec::new());
  };
  let decoded: Value = match serde_json::from_str(raw) {
    Ok(value) => value,
    Err(e) => {
      tracing::error!(collection = %collection, "bundled document is not valid JSON: {e}");
      return Value::Array(Vec::new());
    }
  };

  match envelope_key(collection) {
    Some(key) => match decoded {
      Value::Object(mut map) => map
        .remove(key)
        .unwrap_or_else(|| Value::Array(Vec::new())),
      _ => Value::Array(Vec::new()),
    },
    None => decoded,
  }
}
