//! Shared test fixtures: an in-process HTTP server that plays the remote
//! content endpoint.

use axum::extract::{RawQuery, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// What the stub endpoint does with incoming requests.
#[derive(Debug, Clone)]
pub enum StubBehavior {
  /// Respond 200 with the JSON document
  Json(Value),
  /// Respond with the given status and an empty body
  Status(u16),
  /// Respond 200 with a non-JSON body
  RawBody(&'static str),
  /// Sleep, then respond 200 with the JSON document
  Delay(Duration, Value),
}

struct StubState {
  hits: AtomicUsize,
  last_query: Mutex<Option<String>>,
  behavior: Mutex<StubBehavior>,
}

pub struct StubServer {
  pub url: String,
  state: Arc<StubState>,
  handle: JoinHandle<()>,
}

impl StubServer {
  pub async fn spawn(behavior: StubBehavior) -> Self {
    let state = Arc::new(StubState {
      hits: AtomicUsize::new(0),
      last_query: Mutex::new(None),
      behavior: Mutex::new(behavior),
    });

    let app = axum::Router::new()
      .fallback(handler)
      .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
      axum::serve(listener, app).await.unwrap();
    });

    Self {
      url: format!("http://{addr}/"),
      state,
      handle,
    }
  }

  /// Requests served so far.
  pub fn hits(&self) -> usize {
    self.state.hits.load(Ordering::SeqCst)
  }

  /// Query string of the most recent request.
  pub fn last_query(&self) -> Option<String> {
    self.state.last_query.lock().unwrap().clone()
  }

  /// Swap what the endpoint does with subsequent requests.
  pub fn set_behavior(&self, behavior: StubBehavior) {
    *self.state.behavior.lock().unwrap() = behavior;
  }
}

impl Drop for StubServer {
  fn drop(&mut self) {
    self.handle.abort();
  }
}

async fn handler(State(state): State<Arc<StubState>>, RawQuery(query): RawQuery) -> Response {
  state.hits.fetch_add(1, Ordering::SeqCst);
  *state.last_query.lock().unwrap() = query;

  let behavior = state.behavior.lock().unwrap().clone();
  match behavior {
    StubBehavior::Json(value) => axum::Json(value).into_response(),
    StubBehavior::Status(code) => StatusCode::from_u16(code)
      .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
      .into_response(),
    StubBehavior::RawBody(body) => body.into_response(),
    StubBehavior::Delay(pause, value) => {
      tokio::time::sleep(pause).await;
      axum::Json(value).into_response()
    }
  }
}
