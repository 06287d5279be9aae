//! The turn barrier.
//!
//! Tracks which participants are still owed an action for the current
//! turn, accepts each participant's action exactly once, and reports the
//! roster-complete transition to exactly one caller. Every mutation is a
//! checked-out copy written back through the store's compare-and-swap, so
//! two participants submitting in parallel both land (when distinct) and
//! the "roster now empty" flip has a single winner — the caller whose
//! swap empties the awaited set.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use chronicle_core::clock::Clock;
use chronicle_core::error::DomainError;
use chronicle_core::session::SessionState;
use chronicle_core::store::SessionStore;
use chronicle_core::turn::{Action, SubmitStep, Turn, TurnPhase};

use super::retry::{Backoff, with_backoff};

/// Result of a submission attempt, as seen by the submitting caller.
#[derive(Debug)]
pub enum SubmissionOutcome {
    /// The action landed.
    Accepted {
        /// True for exactly one submission per turn: the one whose swap
        /// emptied the awaited set and flipped the turn to processing.
        barrier_released: bool,
        /// Participants still owed an action after this submission.
        awaited: Vec<String>,
    },
    /// The participant already acted this turn; the prior action is
    /// preserved unchanged. An idempotent no-op signal, not an error.
    DuplicateRejected {
        /// The action already on file.
        existing: Action,
    },
    /// The participant is not on the session's roster.
    UnknownParticipantRejected {
        /// The offending participant name.
        participant: String,
    },
    /// The turn number is stale, the turn is not collecting actions, or
    /// the session is not active.
    TurnClosedRejected,
}

/// Synchronization point for per-turn action collection.
pub struct TurnBarrier {
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    backoff: Backoff,
}

impl TurnBarrier {
    /// Creates a barrier over the given store with the default retry
    /// policy.
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            backoff: Backoff::default(),
        }
    }

    /// Replaces the retry policy.
    #[must_use]
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Opens turn `number`: installs a turn collecting actions from the
    /// full roster, with the given situation prose.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` unless the session is active, and
    /// `TurnAlreadyOpen` if a turn is still collecting or resolving.
    /// Only a placeholder turn for the same number (situation still being
    /// composed) is replaced; turn advancement never goes through here —
    /// resolution archives the old turn and opens the next in one swap.
    pub async fn open_turn(
        &self,
        session_id: Uuid,
        number: u64,
        situation: &str,
    ) -> Result<Turn, DomainError> {
        let turn = with_backoff(self.backoff, || {
            self.try_open(session_id, number, situation)
        })
        .await
        .map_err(exhausted)?;

        info!(%session_id, turn = number, awaited = turn.awaited.len(), "turn opened");
        Ok(turn)
    }

    /// Submits one participant's action for the given turn.
    ///
    /// Rejections come back as `SubmissionOutcome` variants rather than
    /// errors; an `Err` means the store itself failed.
    ///
    /// # Errors
    ///
    /// `TransientFailure` when the swap loses the version race on every
    /// attempt, or the store's own error.
    pub async fn submit_action(
        &self,
        session_id: Uuid,
        turn_number: u64,
        participant: &str,
        user_id: Uuid,
        text: &str,
    ) -> Result<SubmissionOutcome, DomainError> {
        with_backoff(self.backoff, || {
            self.try_submit(session_id, turn_number, participant, user_id, text)
        })
        .await
        .map_err(exhausted)
    }

    /// Read-only snapshot of the participants still owed an action.
    ///
    /// # Errors
    ///
    /// `SessionNotFound` if the session does not exist.
    pub async fn current_awaited(&self, session_id: Uuid) -> Result<Vec<String>, DomainError> {
        let record = self.store.load_session(session_id).await?;
        Ok(record
            .turn
            .map(|turn| turn.awaited)
            .unwrap_or_default())
    }

    async fn try_open(
        &self,
        session_id: Uuid,
        number: u64,
        situation: &str,
    ) -> Result<Turn, DomainError> {
        let mut record = self.store.load_session(session_id).await?;
        if record.session.state != SessionState::Active {
            return Err(DomainError::InvalidTransition {
                session_id,
                state: record.session.state,
                operation: "open turn",
            });
        }

        match record.turn.take() {
            None => {}
            // Placeholder installed while the narrator composes the
            // opening prose.
            Some(current)
                if current.phase == TurnPhase::DescribingSituation
                    && current.number == number => {}
            Some(current) => {
                return Err(DomainError::TurnAlreadyOpen {
                    session_id,
                    number: current.number,
                });
            }
        }

        let turn = Turn::awaiting(number, situation, &record.session.roster);
        record.session.turn_number = number;
        record.turn = Some(turn.clone());
        self.store.compare_and_swap(record).await?;
        Ok(turn)
    }

    async fn try_submit(
        &self,
        session_id: Uuid,
        turn_number: u64,
        participant: &str,
        user_id: Uuid,
        text: &str,
    ) -> Result<SubmissionOutcome, DomainError> {
        let mut record = self.store.load_session(session_id).await?;
        if record.session.state != SessionState::Active {
            return Ok(SubmissionOutcome::TurnClosedRejected);
        }
        let Some(turn) = record.turn.clone() else {
            return Ok(SubmissionOutcome::TurnClosedRejected);
        };
        if turn.number != turn_number {
            return Ok(SubmissionOutcome::TurnClosedRejected);
        }

        let action = Action::new(participant, user_id, text, self.clock.now());
        match turn.apply_submission(&record.session.roster, action) {
            SubmitStep::Closed => Ok(SubmissionOutcome::TurnClosedRejected),
            SubmitStep::UnknownParticipant => Ok(SubmissionOutcome::UnknownParticipantRejected {
                participant: participant.to_owned(),
            }),
            SubmitStep::Duplicate { existing } => {
                Ok(SubmissionOutcome::DuplicateRejected { existing })
            }
            SubmitStep::Applied {
                turn: next,
                released,
            } => {
                let awaited = next.awaited.clone();
                record.turn = Some(next);
                self.store.compare_and_swap(record).await?;
                if released {
                    info!(%session_id, turn = turn_number, participant, "barrier released");
                } else {
                    debug!(%session_id, turn = turn_number, participant, still_awaited = awaited.len(), "action accepted");
                }
                Ok(SubmissionOutcome::Accepted {
                    barrier_released: released,
                    awaited,
                })
            }
        }
    }
}

/// Maps an exhausted version race to the transient-failure kind callers
/// are expected to surface.
fn exhausted(err: DomainError) -> DomainError {
    match err {
        DomainError::ConcurrencyConflict { session_id, .. } => DomainError::TransientFailure(
            format!("session {session_id}: lost the store version race on every attempt"),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use chronicle_core::session::Session;
    use chronicle_store::InMemorySessionStore;
    use chronicle_test_support::{ConflictingSessionStore, FixedClock};

    use super::*;

    fn fixed_clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock::at(2026, 3, 2, 20))
    }

    async fn active_session(store: &InMemorySessionStore, roster: &[&str]) -> Uuid {
        let session = Session::new(
            Uuid::new_v4(),
            "The Sunken Vault",
            roster.iter().map(|s| (*s).to_owned()).collect(),
        );
        let id = session.id;
        let mut record = store.create_session(session).await.unwrap();
        record.session.activate().unwrap();
        store.compare_and_swap(record).await.unwrap();
        id
    }

    fn barrier(store: Arc<dyn SessionStore>) -> TurnBarrier {
        TurnBarrier::new(store, fixed_clock()).with_backoff(Backoff::immediate(3))
    }

    #[tokio::test]
    async fn test_open_turn_awaits_the_full_roster() {
        let store = Arc::new(InMemorySessionStore::new());
        let session_id = active_session(&store, &["Alya", "Borin"]).await;
        let barrier = barrier(store);

        let turn = barrier
            .open_turn(session_id, 1, "A door creaks open.")
            .await
            .unwrap();

        assert_eq!(turn.number, 1);
        assert_eq!(turn.awaited, vec!["Alya", "Borin"]);
        assert_eq!(
            barrier.current_awaited(session_id).await.unwrap(),
            vec!["Alya", "Borin"]
        );
    }

    #[tokio::test]
    async fn test_open_turn_requires_an_active_session() {
        let store = Arc::new(InMemorySessionStore::new());
        let session = Session::new(Uuid::new_v4(), "s", vec!["Alya".to_owned()]);
        let session_id = session.id;
        store.create_session(session).await.unwrap();
        let barrier = barrier(store);

        let err = barrier.open_turn(session_id, 1, "x").await.unwrap_err();

        assert!(matches!(err, DomainError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_open_turn_over_a_collecting_turn_is_rejected() {
        let store = Arc::new(InMemorySessionStore::new());
        let session_id = active_session(&store, &["Alya"]).await;
        let barrier = barrier(store);
        barrier.open_turn(session_id, 1, "x").await.unwrap();

        let err = barrier.open_turn(session_id, 2, "y").await.unwrap_err();

        assert!(matches!(
            err,
            DomainError::TurnAlreadyOpen { number: 1, .. }
        ));
    }

    #[tokio::test]
    async fn test_open_turn_over_a_processing_turn_is_rejected() {
        let store = Arc::new(InMemorySessionStore::new());
        let session_id = active_session(&store, &["Alya"]).await;
        let barrier = barrier(store);
        barrier.open_turn(session_id, 1, "x").await.unwrap();
        // The sole submission flips the turn to processing.
        barrier
            .submit_action(session_id, 1, "Alya", Uuid::new_v4(), "act")
            .await
            .unwrap();

        let err = barrier.open_turn(session_id, 2, "y").await.unwrap_err();

        assert!(matches!(
            err,
            DomainError::TurnAlreadyOpen { number: 1, .. }
        ));
    }

    #[tokio::test]
    async fn test_accepted_submission_shrinks_the_awaited_set() {
        let store = Arc::new(InMemorySessionStore::new());
        let session_id = active_session(&store, &["Alya", "Borin"]).await;
        let barrier = barrier(store);
        barrier.open_turn(session_id, 1, "x").await.unwrap();

        let outcome = barrier
            .submit_action(session_id, 1, "Alya", Uuid::new_v4(), "search the room")
            .await
            .unwrap();

        let SubmissionOutcome::Accepted {
            barrier_released,
            awaited,
        } = outcome
        else {
            panic!("expected Accepted, got {outcome:?}");
        };
        assert!(!barrier_released);
        assert_eq!(awaited, vec!["Borin"]);
    }

    #[tokio::test]
    async fn test_final_submission_reports_release() {
        let store = Arc::new(InMemorySessionStore::new());
        let session_id = active_session(&store, &["Alya", "Borin"]).await;
        let barrier = barrier(store);
        barrier.open_turn(session_id, 1, "x").await.unwrap();
        barrier
            .submit_action(session_id, 1, "Alya", Uuid::new_v4(), "search")
            .await
            .unwrap();

        let outcome = barrier
            .submit_action(session_id, 1, "Borin", Uuid::new_v4(), "light a torch")
            .await
            .unwrap();

        let SubmissionOutcome::Accepted {
            barrier_released,
            awaited,
        } = outcome
        else {
            panic!("expected Accepted, got {outcome:?}");
        };
        assert!(barrier_released);
        assert!(awaited.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_submission_returns_the_prior_action() {
        let store = Arc::new(InMemorySessionStore::new());
        let session_id = active_session(&store, &["Alya", "Borin"]).await;
        let barrier = barrier(store);
        barrier.open_turn(session_id, 1, "x").await.unwrap();
        barrier
            .submit_action(session_id, 1, "Alya", Uuid::new_v4(), "search")
            .await
            .unwrap();

        let outcome = barrier
            .submit_action(session_id, 1, "Alya", Uuid::new_v4(), "flee instead")
            .await
            .unwrap();

        let SubmissionOutcome::DuplicateRejected { existing } = outcome else {
            panic!("expected DuplicateRejected, got {outcome:?}");
        };
        assert_eq!(existing.text, "search");
    }

    #[tokio::test]
    async fn test_unknown_participant_is_rejected() {
        let store = Arc::new(InMemorySessionStore::new());
        let session_id = active_session(&store, &["Alya"]).await;
        let barrier = barrier(store);
        barrier.open_turn(session_id, 1, "x").await.unwrap();

        let outcome = barrier
            .submit_action(session_id, 1, "Mirela", Uuid::new_v4(), "wave")
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            SubmissionOutcome::UnknownParticipantRejected { .. }
        ));
    }

    #[tokio::test]
    async fn test_stale_turn_number_is_rejected() {
        let store = Arc::new(InMemorySessionStore::new());
        let session_id = active_session(&store, &["Alya"]).await;
        let barrier = barrier(store);
        barrier.open_turn(session_id, 3, "x").await.unwrap();

        for stale in [2, 4] {
            let outcome = barrier
                .submit_action(session_id, stale, "Alya", Uuid::new_v4(), "act")
                .await
                .unwrap();
            assert!(matches!(outcome, SubmissionOutcome::TurnClosedRejected));
        }
    }

    #[tokio::test]
    async fn test_submission_while_paused_is_rejected() {
        let store = Arc::new(InMemorySessionStore::new());
        let session_id = active_session(&store, &["Alya"]).await;
        let barrier = barrier(Arc::clone(&store) as Arc<dyn SessionStore>);
        barrier.open_turn(session_id, 1, "x").await.unwrap();

        let mut record = store.load_session(session_id).await.unwrap();
        record.session.pause().unwrap();
        store.compare_and_swap(record).await.unwrap();

        let outcome = barrier
            .submit_action(session_id, 1, "Alya", Uuid::new_v4(), "act")
            .await
            .unwrap();

        assert!(matches!(outcome, SubmissionOutcome::TurnClosedRejected));
    }

    #[tokio::test]
    async fn test_submission_retries_through_version_races() {
        let inner = Arc::new(InMemorySessionStore::new());
        let session_id = active_session(&inner, &["Alya"]).await;
        {
            let setup = barrier(Arc::clone(&inner) as Arc<dyn SessionStore>);
            setup.open_turn(session_id, 1, "x").await.unwrap();
        }

        // The first two swap attempts lose the race; the third lands.
        let flaky = Arc::new(ConflictingSessionStore::new(inner, 2));
        let barrier = barrier(flaky);

        let outcome = barrier
            .submit_action(session_id, 1, "Alya", Uuid::new_v4(), "act")
            .await
            .unwrap();

        assert!(matches!(outcome, SubmissionOutcome::Accepted { .. }));
    }

    #[tokio::test]
    async fn test_submission_surfaces_transient_failure_when_races_exhaust() {
        let inner = Arc::new(InMemorySessionStore::new());
        let session_id = active_session(&inner, &["Alya"]).await;
        {
            let setup = barrier(Arc::clone(&inner) as Arc<dyn SessionStore>);
            setup.open_turn(session_id, 1, "x").await.unwrap();
        }

        let flaky = Arc::new(ConflictingSessionStore::new(inner, u32::MAX));
        let barrier = barrier(flaky);

        let err = barrier
            .submit_action(session_id, 1, "Alya", Uuid::new_v4(), "act")
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::TransientFailure(_)));
    }
}
