//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tally_account::application::config::RuntimeConfig;
use tally_account::application::registry::AccountRegistry;
use tally_core::clock::Clock;
use tally_event_store::in_memory_event_repository::InMemoryEventRepository;
use tally_test_support::FixedClock;
use tower::ServiceExt;

use tally_api::state::AppState;

/// Fixed timestamp used across all integration tests.
fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock(
        chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2026, 1, 15, 10, 0, 0).unwrap(),
    ))
}

/// A running app over one in-memory journal. The router is cheap to clone,
/// and every clone shares the same account workers.
pub struct TestApp {
    pub router: Router,
    pub journal: Arc<InMemoryEventRepository>,
}

/// Build the full app router on a fresh in-memory journal. Uses the same
/// route structure as `main.rs`.
pub fn build_test_app() -> TestApp {
    let journal = Arc::new(InMemoryEventRepository::new());
    let registry = AccountRegistry::new(journal.clone(), fixed_clock(), RuntimeConfig::default());
    let router = tally_api::build_router(AppState::new(Arc::new(registry), journal.clone()));
    TestApp { router, journal }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    // Axum's own rejections answer in plain text.
    let json = serde_json::from_slice(&body_bytes).unwrap_or(serde_json::Value::Null);

    (status, json)
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: &Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();
    send(app, request).await
}

/// Send a POST request without a body and return the response.
pub async fn post_empty(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// JSON for an amount of yen.
pub fn yens(amount: i64) -> serde_json::Value {
    serde_json::json!({ "amount": amount, "currency": "JPY" })
}
