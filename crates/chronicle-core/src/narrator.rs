//! Narrator collaborator port.
//!
//! Narrative generation is external to the engine: the lifecycle manager
//! hands the narrator a structured view of the session and gets prose
//! back. Implementations may call an LLM, a template bank, or a human.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::DomainError;
use crate::turn::Action;

/// The slice of session state a narrator may see.
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Human-readable session name.
    pub session_name: String,
    /// Participant names, roster order.
    pub roster: Vec<String>,
    /// The turn the prose is for.
    pub turn_number: u64,
    /// The situation the previous turn reacted to, if any.
    pub previous_situation: Option<String>,
}

/// External collaborator that turns session context into narrative text.
#[async_trait]
pub trait NarratorService: Send + Sync {
    /// Produces the situation prose that opens a turn.
    async fn open_situation(&self, context: &SessionContext) -> Result<String, DomainError>;

    /// Produces the consequence prose for a completed set of actions.
    async fn resolve_consequences(
        &self,
        context: &SessionContext,
        actions: &BTreeMap<String, Action>,
    ) -> Result<String, DomainError>;
}
