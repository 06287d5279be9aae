//! Session store port.
//!
//! The store exclusively owns durable session/turn state. Components check
//! out a versioned copy, mutate it in their own memory, and write back
//! through `compare_and_swap`; a lost race surfaces as
//! `ConcurrencyConflict` and is retried by the caller. No lock is ever
//! held across a store call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;
use crate::session::Session;
use crate::turn::Turn;

/// Versioned envelope the store keeps per session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    /// The session itself.
    pub session: Session,
    /// The in-flight turn, if any.
    pub turn: Option<Turn>,
    /// Resolved turns, oldest first, kept for audit.
    pub history: Vec<Turn>,
    /// Monotonic record version; bumped by every successful swap.
    pub version: i64,
}

impl SessionRecord {
    /// Wraps a freshly created session with no turn and version 0.
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self {
            session,
            turn: None,
            history: Vec::new(),
            version: 0,
        }
    }
}

/// Repository trait for session records with optimistic concurrency.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persists a new session record at version 1.
    async fn create_session(&self, session: Session) -> Result<SessionRecord, DomainError>;

    /// Loads the current record for a session.
    async fn load_session(&self, id: Uuid) -> Result<SessionRecord, DomainError>;

    /// Atomically replaces the stored record, provided its current version
    /// still equals `record.version`. Returns the record with the bumped
    /// version on success.
    ///
    /// This is the linearization point for every mutation after creation:
    /// concurrent writers race on the version, and exactly one wins.
    async fn compare_and_swap(&self, record: SessionRecord) -> Result<SessionRecord, DomainError>;
}
