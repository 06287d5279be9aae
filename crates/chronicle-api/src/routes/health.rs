//! Engine health endpoint.
//!
//! The probe walks the same lifecycle-to-store path every session route
//! uses, so an unresponsive store shows up here before it shows up as
//! failed turns.

use axum::Json;
use axum::extract::State;
use axum::{Router, routing::get};
use serde::Serialize;
use uuid::Uuid;

use chronicle_core::error::DomainError;

use crate::state::AppState;

/// Health report for the engine and its session store.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status, `ok` or `degraded`.
    pub status: &'static str,
    /// Session store reachability.
    pub store: &'static str,
    /// Build version.
    pub version: &'static str,
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    // The nil id never names a real session; a clean not-found proves the
    // store answered.
    let store = match state.lifecycle.status(Uuid::nil()).await {
        Ok(_) | Err(DomainError::SessionNotFound(_)) => "ok",
        Err(_) => "degraded",
    };
    Json(HealthResponse {
        status: store,
        store,
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Returns the health check router.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
