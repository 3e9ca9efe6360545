//! HTTP client for the spreadsheet-backed content endpoint.
//!
//! The endpoint answers `GET <url>?type=<collection>` with JSON: a bare
//! array for a named collection, or an object keyed by collection name for
//! `type=all`. The body is read as text and decoded separately so a broken
//! body is distinguishable from a broken connection.

use chrono::Utc;
use color_eyre::{eyre::eyre, Result};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use super::types::{extract_payload, Collection};

/// Failure modes of a single fetch.
///
/// The variants are deliberately clonable message carriers rather than
/// wrapped source errors: they travel through fetch state and shared
/// in-flight futures, and the UI only needs the message plus an optional
/// status code.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
  /// Transport failure: DNS, connect, TLS, or timeout.
  #[error("network error: {0}")]
  Network(String),
  /// The endpoint answered with a non-2xx status.
  #[error("endpoint returned HTTP {status}")]
  Http { status: u16 },
  /// The response body was not valid JSON.
  #[error("invalid response body: {0}")]
  Parse(String),
}

/// Thin client over the configured content endpoint.
#[derive(Debug, Clone)]
pub struct RemoteClient {
  http: reqwest::Client,
  endpoint: Url,
}

impl RemoteClient {
  pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
    let endpoint = Url::parse(endpoint)
      .map_err(|e| eyre!("Invalid endpoint URL '{}': {}", endpoint, e))?;

    let http = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| eyre!("Failed to build HTTP client: {}", e))?;

    Ok(Self { http, endpoint })
  }

  /// Fetch one collection and normalize the body into its payload.
  ///
  /// With `bust` set, a `t=<epoch-ms>` parameter is appended so neither the
  /// endpoint's edge cache nor any intermediary can answer with stale bytes.
  pub async fn fetch(&self, collection: Collection, bust: bool) -> Result<Value, FetchError> {
    let mut url = self.endpoint.clone();
    url
      .query_pairs_mut()
      .append_pair("type", collection.as_name());
    if bust {
      url
        .query_pairs_mut()
        .append_pair("t", &Utc::now().timestamp_millis().to_string());
    }

    tracing::debug!(collection = %collection, bust, "fetching collection");

    let response = self
      .http
      .get(url)
      .send()
      .await
      .map_err(|e| FetchError::Network(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
      return Err(FetchError::Http {
        status: status.as_u16(),
      });
    }

    let body = response
      .text()
      .await
      .map_err(|e| FetchError::Network(e.to_string()))?;

    let decoded: Value =
      serde_json::from_str(&body).map_err(|e| FetchError::Parse(e.to_string()))?;

    Ok(extract_payload(collection, decoded))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testutil::{StubBehavior, StubServer};
  use serde_json::json;

  fn client(url: &str) -> RemoteClient {
    RemoteClient::new(url, Duration::from_secs(2)).unwrap()
  }

  #[tokio::test]
  async fn test_fetch_extracts_named_collection_from_keyed_object() {
    let stub = StubServer::spawn(StubBehavior::Json(json!({ "blog": [{ "id": 1 }] }))).await;

    let payload = client(&stub.url).fetch(Collection::Blog, false).await.unwrap();

    assert_eq!(payload, json!([{ "id": 1 }]));
    assert!(stub.last_query().unwrap().contains("type=blog"));
  }

  #[tokio::test]
  async fn test_fetch_accepts_bare_array_body() {
    let stub = StubServer::spawn(StubBehavior::Json(json!([{ "id": 7 }]))).await;

    let payload = client(&stub.url).fetch(Collection::Skill, false).await.unwrap();

    assert_eq!(payload, json!([{ "id": 7 }]));
  }

  #[tokio::test]
  async fn test_fetch_all_returns_whole_object() {
    let body = json!({ "blog": [{ "id": 1 }], "skill": [] });
    let stub = StubServer::spawn(StubBehavior::Json(body.clone())).await;

    let payload = client(&stub.url).fetch(Collection::All, false).await.unwrap();

    assert_eq!(payload, body);
  }

  #[tokio::test]
  async fn test_cache_buster_appended_only_when_requested() {
    let stub = StubServer::spawn(StubBehavior::Json(json!([]))).await;
    let client = client(&stub.url);

    client.fetch(Collection::Blog, false).await.unwrap();
    assert!(!stub.last_query().unwrap().contains("t="));

    client.fetch(Collection::Blog, true).await.unwrap();
    assert!(stub.last_query().unwrap().contains("t="));
  }

  #[tokio::test]
  async fn test_non_2xx_maps_to_http_error() {
    let stub = StubServer::spawn(StubBehavior::Status(404)).await;

    let err = client(&stub.url).fetch(Collection::Blog, false).await.unwrap_err();

    assert!(matches!(err, FetchError::Http { status: 404 }));
  }

  #[tokio::test]
  async fn test_invalid_json_maps_to_parse_error() {
    let stub = StubServer::spawn(StubBehavior::RawBody("<html>oops</html>")).await;

    let err = client(&stub.url).fetch(Collection::Blog, false).await.unwrap_err();

    assert!(matches!(err, FetchError::Parse(_)));
  }

  #[tokio::test]
  async fn test_unreachable_endpoint_maps_to_network_error() {
    // Nothing listens on port 1.
    let client = client("http://127.0.0.1:1/content");

    let err = client.fetch(Collection::Blog, false).await.unwrap_err();

    assert!(matches!(err, FetchError::Network(_)));
  }

  #[tokio::test]
  async fn test_timeout_maps_to_network_error() {
    let stub = StubServer::spawn(StubBehavior::Delay(
      Duration::from_millis(500),
      json!([{ "id": 1 }]),
    ))
    .await;
    let client = RemoteClient::new(&stub.url, Duration::from_millis(50)).unwrap();

    let err = client.fetch(Collection::Blog, false).await.unwrap_err();

    assert!(matches!(err, FetchError::Network(_)));
  }
}
