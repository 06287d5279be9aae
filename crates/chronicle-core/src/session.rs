//! Session identity, mode, and lifecycle state.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Interaction mode of a session.
///
/// Configuration mode accepts slash commands and preparation questions;
/// game mode accepts only in-character actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Preparation mode: slash commands and questions are routed to the
    /// configuration assistant.
    Configuration,
    /// Narrative mode: free text is a participant action, slash commands
    /// are rejected.
    Game,
}

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Roster and world are still being prepared.
    Configuration,
    /// Turns are running.
    Active,
    /// Turns are suspended; the in-flight turn is preserved.
    Paused,
    /// Terminal. The record is kept for audit but never mutated again.
    Ended,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Configuration => "configuration",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Ended => "ended",
        };
        f.write_str(name)
    }
}

/// One storytelling engagement with a fixed participant roster.
///
/// Invariant: `mode == Game` implies `state` is `Active` or `Paused`.
/// Ending a session drops it back to configuration mode, so the invariant
/// holds across the whole lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Session identifier.
    pub id: Uuid,
    /// Human-readable session name.
    pub name: String,
    /// Current interaction mode.
    pub mode: Mode,
    /// Current lifecycle state.
    pub state: SessionState,
    /// Ordered roster of participant names expected every turn. Fixed at
    /// creation; deduplicated preserving first occurrence.
    pub roster: Vec<String>,
    /// Number of the current turn; 0 until the session is activated.
    pub turn_number: u64,
    /// Closing summary recorded when the session ends.
    pub summary: Option<String>,
}

impl Session {
    /// Creates a session in configuration state with the given roster.
    #[must_use]
    pub fn new(id: Uuid, name: impl Into<String>, roster: Vec<String>) -> Self {
        let mut deduped: Vec<String> = Vec::with_capacity(roster.len());
        for participant in roster {
            if !deduped.contains(&participant) {
                deduped.push(participant);
            }
        }
        Self {
            id,
            name: name.into(),
            mode: Mode::Configuration,
            state: SessionState::Configuration,
            roster: deduped,
            turn_number: 0,
            summary: None,
        }
    }

    /// Returns whether `participant` belongs to the roster.
    #[must_use]
    pub fn is_participant(&self, participant: &str) -> bool {
        self.roster.iter().any(|p| p == participant)
    }

    /// Switches the session into game mode.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless the session is in configuration
    /// state, and `EmptyRoster` if no participants were registered.
    pub fn activate(&mut self) -> Result<(), DomainError> {
        if self.state != SessionState::Configuration {
            return Err(self.invalid_transition("activate"));
        }
        if self.roster.is_empty() {
            return Err(DomainError::EmptyRoster(self.id));
        }
        self.mode = Mode::Game;
        self.state = SessionState::Active;
        Ok(())
    }

    /// Suspends an active session. The in-flight turn is untouched.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless the session is active.
    pub fn pause(&mut self) -> Result<(), DomainError> {
        if self.state != SessionState::Active {
            return Err(self.invalid_transition("pause"));
        }
        self.state = SessionState::Paused;
        Ok(())
    }

    /// Resumes a paused session.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless the session is paused.
    pub fn resume(&mut self) -> Result<(), DomainError> {
        if self.state != SessionState::Paused {
            return Err(self.invalid_transition("resume"));
        }
        self.state = SessionState::Active;
        Ok(())
    }

    /// Ends the session. Permitted from any non-terminal state.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` if the session already ended.
    pub fn end(&mut self, summary: Option<String>) -> Result<(), DomainError> {
        if self.state == SessionState::Ended {
            return Err(self.invalid_transition("end"));
        }
        self.mode = Mode::Configuration;
        self.state = SessionState::Ended;
        self.summary = summary;
        Ok(())
    }

    fn invalid_transition(&self, operation: &'static str) -> DomainError {
        DomainError::InvalidTransition {
            session_id: self.id,
            state: self.state,
            operation,
        }
    }
}
