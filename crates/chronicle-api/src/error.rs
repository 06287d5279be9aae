//! Chronicle Engine — API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chronicle_core::error::DomainError;
use serde::Serialize;
use thiserror::Error;

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// HTTP-layer wrapper around `DomainError` that implements `IntoResponse`.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self.0 {
            DomainError::SessionNotFound(_) => (StatusCode::NOT_FOUND, "session_not_found"),
            DomainError::SessionAlreadyExists(_) => {
                (StatusCode::CONFLICT, "session_already_exists")
            }
            DomainError::ConcurrencyConflict { .. } => {
                (StatusCode::CONFLICT, "concurrency_conflict")
            }
            DomainError::InvalidTransition { .. } => {
                (StatusCode::BAD_REQUEST, "invalid_transition")
            }
            DomainError::TurnAlreadyOpen { .. } => (StatusCode::BAD_REQUEST, "turn_already_open"),
            DomainError::EmptyRoster(_) => (StatusCode::BAD_REQUEST, "empty_roster"),
            DomainError::UnknownParticipant(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "unknown_participant")
            }
            DomainError::TransientFailure(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "transient_failure")
            }
            DomainError::Collaborator(_) => (StatusCode::BAD_GATEWAY, "collaborator_error"),
            DomainError::Infrastructure(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "infrastructure_error")
            }
        };

        let body = ErrorBody {
            error: error_code,
            message: self.0.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
