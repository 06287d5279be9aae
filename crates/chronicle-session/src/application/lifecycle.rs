//! The session lifecycle manager.
//!
//! Owns every `Session` state transition and composes the turn barrier
//! with the narrator collaborator: activation opens turn 1, a released
//! barrier is resolved exactly once, and the next turn is opened with
//! fresh situation prose. The narrator is an injected instance, never a
//! process-wide singleton, and no lock is held across a call to it.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use chronicle_core::clock::Clock;
use chronicle_core::error::DomainError;
use chronicle_core::narrator::{NarratorService, SessionContext};
use chronicle_core::session::{Mode, Session, SessionState};
use chronicle_core::store::{SessionRecord, SessionStore};
use chronicle_core::turn::{Action, Turn, TurnPhase};

use super::barrier::{SubmissionOutcome, TurnBarrier};
use super::retry::{Backoff, with_backoff};

/// What activation produced: the opening of turn 1.
#[derive(Debug)]
pub struct Activation {
    /// Always 1.
    pub turn_number: u64,
    /// The opening situation prose.
    pub situation: String,
}

/// What resolving a released barrier produced.
#[derive(Debug)]
pub struct TurnResolution {
    /// The turn that was resolved.
    pub turn_number: u64,
    /// Consequence narrative for the collected actions.
    pub consequences: String,
    /// The turn opened next.
    pub next_turn_number: u64,
    /// Its situation prose.
    pub next_situation: String,
}

/// A submission's outcome, plus the turn resolution when this submission
/// was the one that released the barrier.
#[derive(Debug)]
pub struct SubmitReport {
    /// The barrier's verdict.
    pub outcome: SubmissionOutcome,
    /// Present only on the releasing submission.
    pub resolution: Option<TurnResolution>,
}

/// Read-only projection for status display.
#[derive(Debug)]
pub struct SessionStatus {
    /// The session identifier.
    pub session_id: Uuid,
    /// Lifecycle state.
    pub state: SessionState,
    /// Interaction mode.
    pub mode: Mode,
    /// Current turn number; 0 before activation.
    pub turn_number: u64,
    /// Phase of the in-flight turn, if any.
    pub phase: Option<TurnPhase>,
    /// Participants still owed an action.
    pub awaited: Vec<String>,
}

/// Composes the turn barrier, the classifier's mode source, and the
/// narrator collaborator into the session lifecycle.
pub struct SessionLifecycle {
    store: Arc<dyn SessionStore>,
    narrator: Arc<dyn NarratorService>,
    fallback: Arc<dyn NarratorService>,
    barrier: TurnBarrier,
    backoff: Backoff,
}

impl SessionLifecycle {
    /// Creates a lifecycle manager.
    ///
    /// `narrator` is the primary collaborator; `fallback` is consulted
    /// when the primary fails after bounded retries, so the barrier is
    /// never blocked indefinitely on an external dependency.
    #[must_use]
    pub fn new(
        store: Arc<dyn SessionStore>,
        narrator: Arc<dyn NarratorService>,
        fallback: Arc<dyn NarratorService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let backoff = Backoff::default();
        let barrier = TurnBarrier::new(Arc::clone(&store), clock).with_backoff(backoff);
        Self {
            store,
            narrator,
            fallback,
            barrier,
            backoff,
        }
    }

    /// Replaces the retry policy on the lifecycle and its barrier.
    #[must_use]
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self.barrier = self.barrier.with_backoff(backoff);
        self
    }

    /// Creates a session in configuration state with a finalized roster.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn create(
        &self,
        name: impl Into<String> + Send,
        roster: Vec<String>,
    ) -> Result<SessionRecord, DomainError> {
        let session = Session::new(Uuid::new_v4(), name, roster);
        let record = self.store.create_session(session).await?;
        info!(session_id = %record.session.id, roster = record.session.roster.len(), "session created");
        Ok(record)
    }

    /// Activates a session: switches it to game mode, asks the narrator
    /// for an opening situation, and opens turn 1.
    ///
    /// # Errors
    ///
    /// `EmptyRoster` or `InvalidTransition` when activation is not
    /// permitted; store errors otherwise. Narrator failures do not
    /// surface — the fallback ladder always yields a situation.
    pub async fn activate(&self, session_id: Uuid) -> Result<Activation, DomainError> {
        // Step one is atomic: flip to game mode and install a placeholder
        // turn so a second activation attempt fails fast.
        let record = self
            .update_record(session_id, |record| {
                record.session.activate()?;
                record.session.turn_number = 1;
                record.turn = Some(Turn::describing(1));
                Ok(())
            })
            .await?;
        info!(%session_id, "session activated, composing opening situation");

        let context = context_for(&record.session, 1, None);
        let situation = self.situation_or_fallback(&context).await;
        let turn = self.barrier.open_turn(session_id, 1, &situation).await?;

        Ok(Activation {
            turn_number: turn.number,
            situation,
        })
    }

    /// Submits one participant's action; when this submission releases
    /// the barrier, the same call resolves the turn and opens the next.
    ///
    /// # Errors
    ///
    /// Store errors, or `TransientFailure` after exhausted retries.
    /// Rejections are reported in the `SubmitReport`, not as errors.
    pub async fn submit(
        &self,
        session_id: Uuid,
        turn_number: u64,
        participant: &str,
        user_id: Uuid,
        text: &str,
    ) -> Result<SubmitReport, DomainError> {
        let outcome = self
            .barrier
            .submit_action(session_id, turn_number, participant, user_id, text)
            .await?;

        let resolution = match outcome {
            SubmissionOutcome::Accepted {
                barrier_released: true,
                ..
            } => Some(self.handle_barrier_released(session_id).await?),
            SubmissionOutcome::TurnClosedRejected => {
                self.redrive_if_stalled(session_id, turn_number).await?;
                None
            }
            _ => None,
        };

        Ok(SubmitReport {
            outcome,
            resolution,
        })
    }

    /// A turn left in `ProcessingTurn` means a resolution released the
    /// barrier but lost its final swap on every attempt, and the caller
    /// that owned it got `TransientFailure` back. The next submission
    /// against that turn lands here and re-drives the resolution instead
    /// of leaving the table wedged.
    async fn redrive_if_stalled(
        &self,
        session_id: Uuid,
        turn_number: u64,
    ) -> Result<(), DomainError> {
        let record = self.store.load_session(session_id).await?;
        if record.session.state != SessionState::Active {
            return Ok(());
        }
        let stalled = record.turn.as_ref().is_some_and(|turn| {
            turn.number == turn_number && turn.phase == TurnPhase::ProcessingTurn
        });
        if stalled {
            warn!(%session_id, turn = turn_number, "turn stalled in processing, re-driving resolution");
            self.handle_barrier_released(session_id).await?;
        }
        Ok(())
    }

    /// Resolves a released barrier: consequence narrative, processed
    /// flags, archival of the turn, and the opening of its successor.
    /// Reached by the caller whose swap released the barrier, or by a
    /// re-drive of a stalled turn; the final swap only archives while the
    /// turn is still processing, so the turn advances exactly once no
    /// matter how many resolvers race.
    ///
    /// # Errors
    ///
    /// Store errors; `InvalidTransition` if the session ended while the
    /// turn was being resolved.
    pub async fn handle_barrier_released(
        &self,
        session_id: Uuid,
    ) -> Result<TurnResolution, DomainError> {
        let record = self.store.load_session(session_id).await?;
        // The session may have been ended between the releasing swap and
        // this reload; that is a legitimate interleaving, not a broken
        // store.
        if record.session.state == SessionState::Ended {
            return Err(DomainError::InvalidTransition {
                session_id,
                state: record.session.state,
                operation: "advance turn",
            });
        }
        let Some(turn) = record.turn.clone() else {
            return Err(DomainError::Infrastructure(format!(
                "session {session_id}: barrier released with no turn in flight"
            )));
        };

        let context = context_for(&record.session, turn.number, Some(turn.situation.clone()));
        let consequences = self.consequences_or_fallback(&context, &turn.submitted).await;
        let resolved = turn.resolved(consequences.clone());

        let next_number = turn.number + 1;
        let next_context = context_for(
            &record.session,
            next_number,
            Some(turn.situation.clone()),
        );
        let next_situation = self.situation_or_fallback(&next_context).await;

        // One swap archives the resolved turn and opens its successor, so
        // no observer ever sees the session without a current turn.
        self.update_record(session_id, |record| {
            if record.session.state == SessionState::Ended {
                return Err(DomainError::InvalidTransition {
                    session_id,
                    state: record.session.state,
                    operation: "advance turn",
                });
            }
            // A re-driven resolution can race the original resolver;
            // whichever swap lands second must not archive the turn a
            // second time.
            let still_processing = record.turn.as_ref().is_some_and(|current| {
                current.number == turn.number && current.phase == TurnPhase::ProcessingTurn
            });
            if still_processing {
                record.history.push(resolved.clone());
                record.turn = Some(Turn::awaiting(
                    next_number,
                    next_situation.clone(),
                    &record.session.roster,
                ));
                record.session.turn_number = next_number;
            }
            Ok(())
        })
        .await?;

        info!(%session_id, resolved_turn = turn.number, next_turn = next_number, "turn resolved");
        Ok(TurnResolution {
            turn_number: turn.number,
            consequences,
            next_turn_number: next_number,
            next_situation,
        })
    }

    /// Suspends an active session, preserving the in-flight turn.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` unless the session is active.
    pub async fn pause(&self, session_id: Uuid) -> Result<SessionRecord, DomainError> {
        let record = self
            .update_record(session_id, |record| record.session.pause())
            .await?;
        info!(%session_id, "session paused");
        Ok(record)
    }

    /// Resumes a paused session; previously submitted actions keep their
    /// slot and still-awaited participants remain awaited.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` unless the session is paused.
    pub async fn resume(&self, session_id: Uuid) -> Result<SessionRecord, DomainError> {
        let record = self
            .update_record(session_id, |record| record.session.resume())
            .await?;
        info!(%session_id, turn = record.session.turn_number, "session resumed");
        Ok(record)
    }

    /// Ends the session. The in-flight turn's bookkeeping is discarded;
    /// the record itself is retained for audit, marked terminal.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` if the session already ended.
    pub async fn end(
        &self,
        session_id: Uuid,
        summary: Option<String>,
    ) -> Result<SessionRecord, DomainError> {
        let record = self
            .update_record(session_id, |record| {
                record.session.end(summary.clone())?;
                record.turn = None;
                Ok(())
            })
            .await?;
        info!(%session_id, "session ended");
        Ok(record)
    }

    /// Read-only status projection.
    ///
    /// # Errors
    ///
    /// `SessionNotFound` if the session does not exist.
    pub async fn status(&self, session_id: Uuid) -> Result<SessionStatus, DomainError> {
        let record = self.store.load_session(session_id).await?;
        Ok(SessionStatus {
            session_id,
            state: record.session.state,
            mode: record.session.mode,
            turn_number: record.session.turn_number,
            phase: record.turn.as_ref().map(|turn| turn.phase),
            awaited: record
                .turn
                .map(|turn| turn.awaited)
                .unwrap_or_default(),
        })
    }

    /// Load-mutate-swap with bounded retries on version races. The
    /// mutation closure runs against a fresh checkout on every attempt.
    async fn update_record<F>(
        &self,
        session_id: Uuid,
        mutate: F,
    ) -> Result<SessionRecord, DomainError>
    where
        F: Fn(&mut SessionRecord) -> Result<(), DomainError>,
    {
        let mut delay = self.backoff.base_delay;
        let mut attempt = 1;
        loop {
            let mut record = self.store.load_session(session_id).await?;
            mutate(&mut record)?;
            match self.store.compare_and_swap(record).await {
                Ok(updated) => return Ok(updated),
                Err(err @ DomainError::ConcurrencyConflict { .. }) => {
                    if attempt >= self.backoff.attempts {
                        return Err(DomainError::TransientFailure(format!(
                            "session {session_id}: lost the store version race on every attempt"
                        )));
                    }
                    warn!(%session_id, attempt, error = %err, "version race on session update, retrying");
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err(other) => return Err(other),
            }
        }
    }

    async fn situation_or_fallback(&self, context: &SessionContext) -> String {
        match with_backoff(self.backoff, || self.narrator.open_situation(context)).await {
            Ok(text) => text,
            Err(err) => {
                warn!(turn = context.turn_number, error = %err, "narrator failed to open a situation, using fallback");
                match self.fallback.open_situation(context).await {
                    Ok(text) => text,
                    Err(fallback_err) => {
                        warn!(error = %fallback_err, "fallback narrator failed, using canned situation");
                        canned_situation(context)
                    }
                }
            }
        }
    }

    async fn consequences_or_fallback(
        &self,
        context: &SessionContext,
        actions: &BTreeMap<String, Action>,
    ) -> String {
        match with_backoff(self.backoff, || {
            self.narrator.resolve_consequences(context, actions)
        })
        .await
        {
            Ok(text) => text,
            Err(err) => {
                warn!(turn = context.turn_number, error = %err, "narrator failed to resolve consequences, using fallback");
                match self.fallback.resolve_consequences(context, actions).await {
                    Ok(text) => text,
                    Err(fallback_err) => {
                        warn!(error = %fallback_err, "fallback narrator failed, using canned consequences");
                        canned_consequences(context, actions)
                    }
                }
            }
        }
    }
}

fn context_for(session: &Session, turn_number: u64, previous: Option<String>) -> SessionContext {
    SessionContext {
        session_name: session.name.clone(),
        roster: session.roster.clone(),
        turn_number,
        previous_situation: previous,
    }
}

/// Last-resort situation when both narrators are down. A generic prompt
/// is better than a stuck barrier.
fn canned_situation(context: &SessionContext) -> String {
    format!(
        "**Turn {}**\n\nThe air grows still and every sound feels distant.\n\n**{}**, what do you do?",
        context.turn_number,
        context.roster.join(", ")
    )
}

/// Last-resort consequence narrative when both narrators are down.
fn canned_consequences(context: &SessionContext, actions: &BTreeMap<String, Action>) -> String {
    let lines: Vec<String> = actions
        .values()
        .map(|action| format!("  - **{}**: {}", action.participant, action.text))
        .collect();
    format!(
        "**Turn {} — Consequences**\n\n{}\n\nThe world shifts in answer to your choices.",
        context.turn_number,
        lines.join("\n")
    )
}
