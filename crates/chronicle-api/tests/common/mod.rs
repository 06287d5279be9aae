//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chronicle_core::clock::Clock;
use chronicle_session::application::lifecycle::SessionLifecycle;
use chronicle_store::InMemorySessionStore;
use chronicle_test_support::{FixedClock, ScriptedNarrator};
use http_body_util::BodyExt;
use tower::ServiceExt;

use chronicle_api::routes;
use chronicle_api::state::AppState;

/// Fixed timestamp used across all integration tests.
fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock::at(2026, 1, 15, 10))
}

/// Build the full app router over an in-memory store and a scripted
/// narrator. Uses the same route structure as `main.rs`. The returned
/// router clones share state, so one build can serve a whole scenario.
pub fn build_test_app() -> Router {
    let store = Arc::new(InMemorySessionStore::new());
    let narrator: Arc<dyn chronicle_core::narrator::NarratorService> =
        Arc::new(ScriptedNarrator::new());
    let lifecycle = SessionLifecycle::new(
        store,
        Arc::clone(&narrator),
        narrator,
        fixed_clock(),
    );
    let app_state = AppState::new(Arc::new(lifecycle));

    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1/sessions", routes::session::router())
        .with_state(app_state)
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}
