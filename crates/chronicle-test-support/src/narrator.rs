//! Test narrators — deterministic `NarratorService` implementations.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use chronicle_core::error::DomainError;
use chronicle_core::narrator::{NarratorService, SessionContext};
use chronicle_core::turn::Action;

/// A narrator that returns predictable prose keyed on the turn number and
/// counts how often each operation was invoked. The call counters let
/// tests assert that resolution ran exactly once.
#[derive(Debug, Default)]
pub struct ScriptedNarrator {
    situation_calls: AtomicU32,
    consequence_calls: AtomicU32,
}

impl ScriptedNarrator {
    /// Creates a scripted narrator with zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times `open_situation` was called.
    pub fn situation_calls(&self) -> u32 {
        self.situation_calls.load(Ordering::SeqCst)
    }

    /// How many times `resolve_consequences` was called.
    pub fn consequence_calls(&self) -> u32 {
        self.consequence_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NarratorService for ScriptedNarrator {
    async fn open_situation(&self, context: &SessionContext) -> Result<String, DomainError> {
        self.situation_calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("scripted situation for turn {}", context.turn_number))
    }

    async fn resolve_consequences(
        &self,
        context: &SessionContext,
        _actions: &BTreeMap<String, Action>,
    ) -> Result<String, DomainError> {
        self.consequence_calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!(
            "scripted consequences for turn {}",
            context.turn_number
        ))
    }
}

/// A narrator whose every call fails. Used to exercise the fallback
/// ladder in turn resolution.
#[derive(Debug)]
pub struct FailingNarrator;

#[async_trait]
impl NarratorService for FailingNarrator {
    async fn open_situation(&self, _context: &SessionContext) -> Result<String, DomainError> {
        Err(DomainError::Collaborator("narrator unavailable".to_owned()))
    }

    async fn resolve_consequences(
        &self,
        _context: &SessionContext,
        _actions: &BTreeMap<String, Action>,
    ) -> Result<String, DomainError> {
        Err(DomainError::Collaborator("narrator unavailable".to_owned()))
    }
}
