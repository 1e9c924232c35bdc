//! HTTP layer for adboard.
//!
//! Exposes an axum [`Router`] serving the advertisement resource backed by
//! any [`AdStore`]. Callers authenticate with HTTP Basic; anonymous traffic
//! is rate-limited before it is turned away.

pub mod auth;
pub mod error;
pub mod throttle;
pub mod viewset;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use adboard_core::store::AdStore;
use axum::{Router, middleware, routing::get};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use throttle::AnonThrottle;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `ADBOARD_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                String,
  #[serde(default = "default_port")]
  pub port:                u16,
  #[serde(default = "default_store_path")]
  pub store_path:          PathBuf,
  /// Anonymous request cap, e.g. `"100/day"`. Unset disables throttling.
  #[serde(default)]
  pub anon_rate:           Option<String>,
  /// Key anonymous callers by the first `X-Forwarded-For` hop. Only enable
  /// behind a proxy that sets the header.
  #[serde(default)]
  pub trust_forwarded_for: bool,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8000 }

fn default_store_path() -> PathBuf { PathBuf::from("adboard.db") }

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: AdStore> {
  pub store:    Arc<S>,
  pub throttle: Arc<AnonThrottle>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the advertisement router.
///
/// Each route maps one method to one [`viewset`] operation; all of them sit
/// behind [`auth::identify`], which resolves the caller and throttles
/// anonymous requests.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: AdStore + Clone + 'static,
{
  Router::new()
    .route("/advs", get(viewset::list::<S>).post(viewset::create::<S>))
    .route(
      "/advs/{id}",
      get(viewset::retrieve::<S>)
        .put(viewset::update::<S>)
        .patch(viewset::partial_update::<S>)
        .delete(viewset::destroy::<S>),
    )
    .route_layer(middleware::from_fn_with_state(
      state.clone(),
      auth::identify::<S>,
    ))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}


// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use adboard_store_sqlite::SqliteStore;
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
  };
  use serde_json::{Value, json};
  use tower::ServiceExt as _;

  use super::*;
  use crate::{
    test_support::{basic, cheap_hash},
    throttle::ThrottleRate,
  };

  async fn make_state(throttle: AnonThrottle) -> AppState<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    for name in ["alice", "bob"] {
      store.add_user(name.into(), cheap_hash("secret")).await.unwrap();
    }
    AppState {
      store:    Arc::new(store),
      throttle: Arc::new(throttle),
    }
  }

  async fn state() -> AppState<SqliteStore> {
    make_state(AnonThrottle::disabled()).await
  }

  async fn send(
    state: &AppState<SqliteStore>,
    method: &str,
    uri: &str,
    user: Option<&str>,
    body: Option<Value>,
  ) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
      builder = builder.header(header::AUTHORIZATION, basic(user, "secret"));
    }
    let body = match body {
      Some(v) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(v.to_string())
      }
      None => Body::empty(),
    };
    router(state.clone())
      .oneshot(builder.body(body).unwrap())
      .await
      .unwrap()
  }

  async fn json_body(resp: Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  async fn create_as(state: &AppState<SqliteStore>, user: &str, text: &str) -> Value {
    let resp = send(state, "POST", "/advs", Some(user), Some(json!({ "text": text }))).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    json_body(resp).await
  }

  // ── Create ───────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn create_substitutes_username_and_sets_owner() {
    let state = state().await;
    let resp = send(
      &state,
      "POST",
      "/advs",
      Some("alice"),
      Some(json!({
        "text": "Hi {{ user }}, welcome {{ user }}",
        "user": { "id": 2, "username": "bob" },
        "id": 999,
        "created_at": "1999-01-01T00:00:00Z",
      })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body = json_body(resp).await;
    assert_eq!(body["text"], "Hi alice, welcome alice");
    assert_eq!(body["user"]["username"], "alice");
    assert_eq!(body["open"], true);
    assert_ne!(body["id"], 999);
    assert_ne!(body["created_at"], "1999-01-01T00:00:00Z");

    let stored = state.store.get_adv(body["id"].as_i64().unwrap()).await.unwrap().unwrap();
    assert_eq!(stored.text, "Hi alice, welcome alice");
    assert_eq!(stored.user.username, "alice");
  }

  #[tokio::test]
  async fn create_trims_text_and_rejects_numbers() {
    let state = state().await;
    let body = create_as(&state, "alice", "  bike for {{ user }}  ").await;
    assert_eq!(body["text"], "bike for alice");

    let resp = send(&state, "POST", "/advs", Some("alice"), Some(json!({ "text": 42 }))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await, json!({ "text": ["Not a valid string."] }));
    assert_eq!(state.store.list_advs().await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn create_exposes_only_public_user_fields() {
    let state = state().await;
    let body = create_as(&state, "alice", "hello").await;
    let mut user_keys: Vec<&str> =
      body["user"].as_object().unwrap().keys().map(String::as_str).collect();
    user_keys.sort_unstable();
    assert_eq!(user_keys, ["id", "username"]);
  }

  #[tokio::test]
  async fn anonymous_create_is_rejected_and_nothing_persisted() {
    let state = state().await;
    let resp = send(&state, "POST", "/advs", None, Some(json!({ "text": "spam" }))).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));
    assert!(state.store.list_advs().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn wrong_password_is_unauthenticated() {
    let state = state().await;
    let req = Request::builder()
      .method("GET")
      .uri("/advs")
      .header(header::AUTHORIZATION, basic("alice", "nope"))
      .body(Body::empty())
      .unwrap();
    let resp = router(state).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn create_without_text_is_a_field_error() {
    let state = state().await;
    let resp = send(&state, "POST", "/advs", Some("alice"), Some(json!({ "open": false }))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = json_body(resp).await;
    assert_eq!(body, json!({ "text": ["This field is required."] }));
    assert!(state.store.list_advs().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn malformed_json_is_bad_request() {
    let state = state().await;
    let req = Request::builder()
      .method("POST")
      .uri("/advs")
      .header(header::AUTHORIZATION, basic("alice", "secret"))
      .body(Body::from("{not json"))
      .unwrap();
    let resp = router(state).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(resp).await["detail"].is_string());
  }

  // ── Read ─────────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn any_authenticated_caller_can_read_any_record() {
    let state = state().await;
    let created = create_as(&state, "alice", "alice's bike").await;
    let id = created["id"].as_i64().unwrap();

    let resp = send(&state, "GET", &format!("/advs/{id}"), Some("bob"), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await, created);

    create_as(&state, "bob", "bob's lamp").await;
    let resp = send(&state, "GET", "/advs", Some("bob"), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let list = json_body(resp).await;
    let texts: Vec<&str> = list
      .as_array()
      .unwrap()
      .iter()
      .map(|a| a["text"].as_str().unwrap())
      .collect();
    assert_eq!(texts, ["alice's bike", "bob's lamp"]);
  }

  #[tokio::test]
  async fn anonymous_read_is_rejected() {
    let state = state().await;
    let resp = send(&state, "GET", "/advs", None, None).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn missing_and_malformed_ids_are_not_found() {
    let state = state().await;
    for uri in ["/advs/41", "/advs/not-a-number"] {
      let resp = send(&state, "GET", uri, Some("alice"), None).await;
      assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
    }
  }

  // ── Update / delete ──────────────────────────────────────────────────────────

  #[tokio::test]
  async fn owner_can_close_and_reopen() {
    let state = state().await;
    let id = create_as(&state, "alice", "bike").await["id"].as_i64().unwrap();
    let uri = format!("/advs/{id}");

    let resp = send(&state, "PATCH", &uri, Some("alice"), Some(json!({ "open": false }))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["open"], false);

    let resp = send(&state, "GET", &uri, Some("bob"), None).await;
    let body = json_body(resp).await;
    assert_eq!(body["open"], false);
    assert_eq!(body["text"], "bike");

    let resp = send(&state, "PATCH", &uri, Some("alice"), Some(json!({ "open": true }))).await;
    assert_eq!(json_body(resp).await["open"], true);
  }

  #[tokio::test]
  async fn owner_full_update_requires_text() {
    let state = state().await;
    let id = create_as(&state, "alice", "bike").await["id"].as_i64().unwrap();
    let uri = format!("/advs/{id}");

    let resp = send(&state, "PUT", &uri, Some("alice"), Some(json!({ "open": false }))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = send(
      &state,
      "PUT",
      &uri,
      Some("alice"),
      Some(json!({ "text": "red bike {{ user }}", "open": false, "user": { "id": 2 } })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["text"], "red bike {{ user }}");
    assert_eq!(body["open"], false);
    assert_eq!(body["user"]["username"], "alice");
  }

  #[tokio::test]
  async fn non_owner_cannot_mutate() {
    let state = state().await;
    let created = create_as(&state, "alice", "bike").await;
    let id = created["id"].as_i64().unwrap();
    let uri = format!("/advs/{id}");

    let attempts = [
      ("PUT", Some(json!({ "text": "mine now" }))),
      ("PATCH", Some(json!({ "open": false }))),
      ("DELETE", None),
    ];
    for (method, body) in attempts {
      let resp = send(&state, method, &uri, Some("bob"), body).await;
      assert_eq!(resp.status(), StatusCode::FORBIDDEN, "{method}");
    }

    let resp = send(&state, "GET", &uri, Some("alice"), None).await;
    assert_eq!(json_body(resp).await, created);
  }

  #[tokio::test]
  async fn forbidden_takes_precedence_over_validation() {
    let state = state().await;
    let id = create_as(&state, "alice", "bike").await["id"].as_i64().unwrap();
    let resp = send(
      &state,
      "PATCH",
      &format!("/advs/{id}"),
      Some("bob"),
      Some(json!({ "open": "nope" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
  }

  #[tokio::test]
  async fn owner_can_delete() {
    let state = state().await;
    let id = create_as(&state, "alice", "bike").await["id"].as_i64().unwrap();
    let uri = format!("/advs/{id}");

    let resp = send(&state, "DELETE", &uri, Some("alice"), None).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = send(&state, "GET", &uri, Some("alice"), None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  // ── Throttle ─────────────────────────────────────────────────────────────────

  fn two_per_hour() -> AnonThrottle {
    AnonThrottle::new(
      Some(ThrottleRate { num_requests: 2, period: Duration::from_secs(3600) }),
      false,
    )
  }

  #[tokio::test]
  async fn anonymous_callers_are_throttled_past_the_cap() {
    let state = make_state(two_per_hour()).await;
    for _ in 0..2 {
      let resp = send(&state, "GET", "/advs", None, None).await;
      assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
    let resp = send(&state, "GET", "/advs", None, None).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(resp.headers().contains_key(header::RETRY_AFTER));

    let resp = send(&state, "POST", "/advs", None, Some(json!({ "text": "x" }))).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(state.store.list_advs().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn authenticated_callers_are_not_throttled() {
    let state = make_state(two_per_hour()).await;
    for _ in 0..5 {
      let resp = send(&state, "GET", "/advs", Some("alice"), None).await;
      assert_eq!(resp.status(), StatusCode::OK);
    }
  }

  #[tokio::test]
  async fn unknown_routes_are_not_throttled() {
    let state = make_state(two_per_hour()).await;
    for _ in 0..4 {
      let resp = send(&state, "GET", "/nowhere", None, None).await;
      assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
  }
}
