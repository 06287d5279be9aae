//! Routes for session lifecycle, turn submission, and inbound text.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing::get, routing::post};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use chronicle_core::session::{Mode, SessionState};
use chronicle_core::store::SessionRecord;
use chronicle_core::turn::{Action, TurnPhase};
use chronicle_session::application::barrier::SubmissionOutcome;
use chronicle_session::application::lifecycle::{SubmitReport, TurnResolution};
use chronicle_session::domain::classify::{Classification, classify};

use crate::error::{ApiError, ErrorBody};
use crate::state::AppState;

/// Request body for POST /.
#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    /// Human-readable session name.
    pub name: String,
    /// Participant names expected to act every turn.
    pub roster: Vec<String>,
}

/// Request body for POST /{id}/submit.
#[derive(Debug, Deserialize)]
pub struct SubmitActionRequest {
    /// Roster name of the acting participant.
    pub participant: String,
    /// The user submitting on that participant's behalf.
    pub user_id: Uuid,
    /// The turn the client believes is open.
    pub turn_number: u64,
    /// Free-text declaration of the action.
    pub text: String,
}

/// Request body for POST /{id}/input.
#[derive(Debug, Deserialize)]
pub struct InputRequest {
    /// Roster name of the participant the text is attributed to.
    pub participant: String,
    /// The user who typed the text.
    pub user_id: Uuid,
    /// The raw inbound text.
    pub text: String,
}

/// Request body for POST /{id}/end.
#[derive(Debug, Deserialize)]
pub struct EndSessionRequest {
    /// Optional closing summary.
    #[serde(default)]
    pub summary: Option<String>,
}

/// Session snapshot returned by the lifecycle endpoints.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    /// Session identifier.
    pub session_id: Uuid,
    /// Human-readable session name.
    pub name: String,
    /// Current lifecycle state.
    pub state: SessionState,
    /// Current interaction mode.
    pub mode: Mode,
    /// Ordered participant roster.
    pub roster: Vec<String>,
    /// Number of the current turn; 0 before activation.
    pub turn_number: u64,
    /// Closing summary, present once the session has ended.
    pub summary: Option<String>,
}

impl SessionResponse {
    fn from_record(record: &SessionRecord) -> Self {
        Self {
            session_id: record.session.id,
            name: record.session.name.clone(),
            state: record.session.state,
            mode: record.session.mode,
            roster: record.session.roster.clone(),
            turn_number: record.session.turn_number,
            summary: record.session.summary.clone(),
        }
    }
}

/// Response body for POST /{id}/activate.
#[derive(Debug, Serialize)]
pub struct ActivationResponse {
    /// Number of the opened turn; always 1.
    pub turn_number: u64,
    /// The opening situation presented to the table.
    pub situation: String,
}

/// Turn resolution produced when a submission releases the barrier.
#[derive(Debug, Serialize)]
pub struct ResolutionBody {
    /// Number of the resolved turn.
    pub turn_number: u64,
    /// Consequence narrative for the resolved turn.
    pub consequences: String,
    /// Number of the turn opened immediately after.
    pub next_turn_number: u64,
    /// Situation presented for the next turn.
    pub next_situation: String,
}

impl From<TurnResolution> for ResolutionBody {
    fn from(resolution: TurnResolution) -> Self {
        Self {
            turn_number: resolution.turn_number,
            consequences: resolution.consequences,
            next_turn_number: resolution.next_turn_number,
            next_situation: resolution.next_situation,
        }
    }
}

/// Response body for POST /{id}/submit.
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmitResponse {
    /// The action landed.
    Accepted {
        /// True for the one submission that released the barrier.
        barrier_released: bool,
        /// Participants still owed an action this turn.
        awaited: Vec<String>,
        /// Present only when this submission released the barrier.
        #[serde(skip_serializing_if = "Option::is_none")]
        resolution: Option<ResolutionBody>,
    },
    /// The participant already acted this turn; nothing changed.
    Duplicate {
        /// The action already on file.
        existing: Action,
    },
    /// The participant is not on the session's roster.
    UnknownParticipant {
        /// The offending participant name.
        participant: String,
    },
    /// The turn is stale, not collecting, or the session is not active.
    TurnClosed,
}

/// Response body for POST /{id}/input.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputResponse {
    /// A configuration command was recognized and acknowledged.
    Command {
        /// Command name, lowercased, without the slash.
        name: String,
        /// Everything after the command name.
        args: String,
    },
    /// A free-form configuration question was accepted.
    Question {
        /// The question text.
        text: String,
    },
}

/// Response body for GET /{id}/status.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Session identifier.
    pub session_id: Uuid,
    /// Current lifecycle state.
    pub state: SessionState,
    /// Current interaction mode.
    pub mode: Mode,
    /// Number of the current turn.
    pub turn_number: u64,
    /// Phase of the in-flight turn, if one exists.
    pub phase: Option<TurnPhase>,
    /// Participants still owed an action this turn.
    pub awaited: Vec<String>,
}

/// POST /
#[instrument(skip(state, request), fields(name = %request.name))]
async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let record = state.lifecycle.create(request.name, request.roster).await?;
    info!(session_id = %record.session.id, "session created");
    Ok((StatusCode::CREATED, Json(SessionResponse::from_record(&record))))
}

/// POST /{id}/activate
#[instrument(skip(state))]
async fn activate_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ActivationResponse>, ApiError> {
    let activation = state.lifecycle.activate(id).await?;
    info!(session_id = %id, "session activated");
    Ok(Json(ActivationResponse {
        turn_number: activation.turn_number,
        situation: activation.situation,
    }))
}

/// POST /{id}/submit
#[instrument(
    skip(state, request),
    fields(participant = %request.participant, turn_number = request.turn_number)
)]
async fn submit_action(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SubmitActionRequest>,
) -> Result<Response, ApiError> {
    let report = state
        .lifecycle
        .submit(
            id,
            request.turn_number,
            &request.participant,
            request.user_id,
            &request.text,
        )
        .await?;
    Ok(submit_response(report))
}

/// POST /{id}/input
///
/// Routes raw text through the mode classifier: configuration traffic is
/// acknowledged here, game actions are forwarded to the turn barrier
/// against the session's current turn.
#[instrument(skip(state, request), fields(participant = %request.participant))]
async fn session_input(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<InputRequest>,
) -> Result<Response, ApiError> {
    let status = state.lifecycle.status(id).await?;

    match classify(status.mode, &request.text) {
        Classification::ConfigCommand { name, args } => {
            info!(session_id = %id, command = %name, "configuration command received");
            Ok(Json(InputResponse::Command { name, args }).into_response())
        }
        Classification::ConfigQuestion { text } => {
            Ok(Json(InputResponse::Question { text }).into_response())
        }
        Classification::GameAction { text } => {
            let report = state
                .lifecycle
                .submit(
                    id,
                    status.turn_number,
                    &request.participant,
                    request.user_id,
                    &text,
                )
                .await?;
            Ok(submit_response(report))
        }
        Classification::Rejected { reason } => Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorBody {
                error: "rejected_input",
                message: reason,
            }),
        )
            .into_response()),
    }
}

/// GET /{id}/status
#[instrument(skip(state))]
async fn session_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<StatusResponse>, ApiError> {
    let status = state.lifecycle.status(id).await?;
    Ok(Json(StatusResponse {
        session_id: status.session_id,
        state: status.state,
        mode: status.mode,
        turn_number: status.turn_number,
        phase: status.phase,
        awaited: status.awaited,
    }))
}

/// POST /{id}/pause
#[instrument(skip(state))]
async fn pause_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, ApiError> {
    let record = state.lifecycle.pause(id).await?;
    info!(session_id = %id, "session paused");
    Ok(Json(SessionResponse::from_record(&record)))
}

/// POST /{id}/resume
#[instrument(skip(state))]
async fn resume_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, ApiError> {
    let record = state.lifecycle.resume(id).await?;
    info!(session_id = %id, "session resumed");
    Ok(Json(SessionResponse::from_record(&record)))
}

/// POST /{id}/end
#[instrument(skip(state, request))]
async fn end_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<EndSessionRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let record = state.lifecycle.end(id, request.summary).await?;
    info!(session_id = %id, "session ended");
    Ok(Json(SessionResponse::from_record(&record)))
}

fn submit_response(report: SubmitReport) -> Response {
    match report.outcome {
        SubmissionOutcome::Accepted {
            barrier_released,
            awaited,
        } => Json(SubmitResponse::Accepted {
            barrier_released,
            awaited,
            resolution: report.resolution.map(ResolutionBody::from),
        })
        .into_response(),
        SubmissionOutcome::DuplicateRejected { existing } => {
            Json(SubmitResponse::Duplicate { existing }).into_response()
        }
        SubmissionOutcome::UnknownParticipantRejected { participant } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(SubmitResponse::UnknownParticipant { participant }),
        )
            .into_response(),
        SubmissionOutcome::TurnClosedRejected => {
            (StatusCode::CONFLICT, Json(SubmitResponse::TurnClosed)).into_response()
        }
    }
}

/// Returns the router for the session context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_session))
        .route("/{id}/activate", post(activate_session))
        .route("/{id}/submit", post(submit_action))
        .route("/{id}/input", post(session_input))
        .route("/{id}/status", get(session_status))
        .route("/{id}/pause", post(pause_session))
        .route("/{id}/resume", post(resume_session))
        .route("/{id}/end", post(end_session))
}
