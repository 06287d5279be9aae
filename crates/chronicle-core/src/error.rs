//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

use crate::session::SessionState;

/// Top-level domain error type.
///
/// Every variant carries enough context for a transport to map it to an
/// appropriate status code without parsing message strings.
#[derive(Debug, Error)]
pub enum DomainError {
    /// No session exists under the given identifier.
    #[error("session not found: {0}")]
    SessionNotFound(Uuid),

    /// A session already exists under the given identifier.
    #[error("session already exists: {0}")]
    SessionAlreadyExists(Uuid),

    /// The requested lifecycle operation is not valid from the session's
    /// current state.
    #[error("session {session_id} is {state}, cannot {operation}")]
    InvalidTransition {
        /// The session the operation was attempted on.
        session_id: Uuid,
        /// The state the session was in.
        state: SessionState,
        /// The attempted operation, e.g. `"activate"`.
        operation: &'static str,
    },

    /// A new turn was requested while one is still collecting or
    /// resolving actions.
    #[error("session {session_id} already has turn {number} in flight")]
    TurnAlreadyOpen {
        /// The session the turn was requested on.
        session_id: Uuid,
        /// The number of the in-flight turn.
        number: u64,
    },

    /// Activation was attempted with no expected participants.
    #[error("session {0} has an empty roster and cannot be activated")]
    EmptyRoster(Uuid),

    /// The named participant is not part of the session's roster.
    #[error("unknown participant: {0}")]
    UnknownParticipant(String),

    /// Optimistic concurrency conflict on the session record.
    #[error(
        "concurrency conflict on session {session_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        /// The session that had the conflict.
        session_id: Uuid,
        /// The version the caller expected.
        expected: i64,
        /// The version actually found.
        actual: i64,
    },

    /// A retried operation exhausted its attempts.
    #[error("transient failure: {0}")]
    TransientFailure(String),

    /// The narrator collaborator failed.
    #[error("narrator collaborator failed: {0}")]
    Collaborator(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl DomainError {
    /// Whether retrying the failed operation can succeed. Validation
    /// errors are surfaced to the caller verbatim and never retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConcurrencyConflict { .. } | Self::Collaborator(_) | Self::Infrastructure(_)
        )
    }
}
