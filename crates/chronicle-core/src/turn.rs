//! Turn state and the pure submission transition.
//!
//! A turn value is never mutated in place: every transition produces a new
//! `Turn`, and the store's compare-and-swap decides whether it lands. The
//! barrier invariant lives here: while a turn is awaiting actions,
//! `awaited` and the keys of `submitted` partition the session roster.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Phase of a turn within the play cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    /// The narrator is composing the situation; no submissions yet.
    DescribingSituation,
    /// Situation published, collecting one action per participant.
    AwaitingActions,
    /// All actions are in; consequences are being resolved.
    ProcessingTurn,
}

/// One action declared by a participant for a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Roster name of the acting participant.
    pub participant: String,
    /// The user who submitted on that participant's behalf.
    pub user_id: Uuid,
    /// Free-text declaration of the action.
    pub text: String,
    /// When the submission was accepted.
    pub submitted_at: DateTime<Utc>,
    /// Set by turn resolution, never by submission.
    pub processed: bool,
}

impl Action {
    /// Creates an unprocessed action.
    #[must_use]
    pub fn new(
        participant: impl Into<String>,
        user_id: Uuid,
        text: impl Into<String>,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            participant: participant.into(),
            user_id,
            text: text.into(),
            submitted_at,
            processed: false,
        }
    }
}

/// One round of the barrier protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// Turn number, monotonic from 1.
    pub number: u64,
    /// Current phase.
    pub phase: TurnPhase,
    /// The situation prose participants are reacting to.
    pub situation: String,
    /// Participants still owed an action this turn, in roster order.
    pub awaited: Vec<String>,
    /// Actions received so far, keyed by participant.
    pub submitted: BTreeMap<String, Action>,
    /// Consequence narrative written by turn resolution.
    pub resolution: Option<String>,
}

/// Outcome of applying one submission to a turn value.
#[derive(Debug)]
pub enum SubmitStep {
    /// The submission landed. `turn` is the successor value to persist;
    /// `released` is true when this submission emptied the awaited set and
    /// flipped the turn into `ProcessingTurn`.
    Applied {
        /// Successor turn value.
        turn: Turn,
        /// Whether this submission released the barrier.
        released: bool,
    },
    /// The participant already submitted this turn; the prior action is
    /// preserved unchanged.
    Duplicate {
        /// The action already on file.
        existing: Action,
    },
    /// The participant is not part of the roster.
    UnknownParticipant,
    /// The turn is not collecting actions.
    Closed,
}

impl Turn {
    /// Creates a turn whose situation is still being composed.
    #[must_use]
    pub fn describing(number: u64) -> Self {
        Self {
            number,
            phase: TurnPhase::DescribingSituation,
            situation: String::new(),
            awaited: Vec::new(),
            submitted: BTreeMap::new(),
            resolution: None,
        }
    }

    /// Creates a turn collecting actions, with the full roster awaited.
    #[must_use]
    pub fn awaiting(number: u64, situation: impl Into<String>, roster: &[String]) -> Self {
        Self {
            number,
            phase: TurnPhase::AwaitingActions,
            situation: situation.into(),
            awaited: roster.to_vec(),
            submitted: BTreeMap::new(),
            resolution: None,
        }
    }

    /// Applies one submission, producing a successor turn value.
    ///
    /// Completion is detected by set cardinality: the submission that moves
    /// the final awaited participant into `submitted` is the one — and the
    /// only one — reported as releasing the barrier.
    #[must_use]
    pub fn apply_submission(&self, roster: &[String], action: Action) -> SubmitStep {
        if self.phase != TurnPhase::AwaitingActions {
            return SubmitStep::Closed;
        }
        if !roster.iter().any(|p| *p == action.participant) {
            return SubmitStep::UnknownParticipant;
        }
        if let Some(existing) = self.submitted.get(&action.participant) {
            return SubmitStep::Duplicate {
                existing: existing.clone(),
            };
        }

        let mut next = self.clone();
        next.awaited.retain(|p| *p != action.participant);
        next.submitted.insert(action.participant.clone(), action);

        let released = next.awaited.is_empty();
        if released {
            next.phase = TurnPhase::ProcessingTurn;
        }
        SubmitStep::Applied {
            turn: next,
            released,
        }
    }

    /// Produces the resolved successor of a processing turn: every
    /// submitted action marked processed, the consequence narrative
    /// recorded.
    #[must_use]
    pub fn resolved(&self, narrative: impl Into<String>) -> Self {
        let mut done = self.clone();
        for action in done.submitted.values_mut() {
            action.processed = true;
        }
        done.resolution = Some(narrative.into());
        done
    }
}
