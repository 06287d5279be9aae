//! Chronicle session engine API server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use chronicle_api::error::AppError;
use chronicle_api::routes;
use chronicle_api::state::AppState;
use chronicle_core::clock::SystemClock;
use chronicle_narrator::{TemplateNarrator, ThreadRng};
use chronicle_session::application::lifecycle::SessionLifecycle;
use chronicle_store::InMemorySessionStore;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Chronicle session engine API server");

    // Read configuration from environment.
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse()
        .map_err(|e| AppError::Config(format!("PORT must be a valid u16: {e}")))?;

    // Build application state. The template narrator serves as both the
    // primary and the fallback; the canned prose inside the lifecycle is
    // the last rung of the ladder.
    let store = Arc::new(InMemorySessionStore::new());
    let narrator: Arc<dyn chronicle_core::narrator::NarratorService> =
        Arc::new(TemplateNarrator::new(Box::new(ThreadRng)));
    let lifecycle = SessionLifecycle::new(
        store,
        Arc::clone(&narrator),
        narrator,
        Arc::new(SystemClock),
    );
    let app_state = AppState::new(Arc::new(lifecycle));

    // Build router.
    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    let app = Router::new()
        .merge(routes::health::router())
        .nest("/api/v1/sessions", routes::session::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server.
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
