//! Concurrency stress tests for the turn barrier.
//!
//! These run on a multi-threaded runtime: submissions land from truly
//! parallel tasks, and the assertions hold for every interleaving.

use std::sync::Arc;

use uuid::Uuid;

use chronicle_core::clock::Clock;
use chronicle_core::session::SessionState;
use chronicle_core::turn::TurnPhase;
use chronicle_session::application::barrier::SubmissionOutcome;
use chronicle_session::application::lifecycle::SessionLifecycle;
use chronicle_session::application::retry::Backoff;
use chronicle_store::InMemorySessionStore;
use chronicle_test_support::{FixedClock, ScriptedNarrator};

fn lifecycle() -> (Arc<SessionLifecycle>, Arc<ScriptedNarrator>) {
    let narrator = Arc::new(ScriptedNarrator::new());
    let clock: Arc<dyn Clock> = Arc::new(FixedClock::at(2026, 3, 2, 20));
    let lifecycle = SessionLifecycle::new(
        Arc::new(InMemorySessionStore::new()),
        narrator.clone(),
        Arc::new(ScriptedNarrator::new()),
        clock,
    )
    // High contention needs more swap attempts than the production
    // default; zero delay keeps the test fast.
    .with_backoff(Backoff::immediate(64));
    (Arc::new(lifecycle), narrator)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_n_concurrent_submitters_release_the_barrier_exactly_once() {
    let (lifecycle, narrator) = lifecycle();
    let roster: Vec<String> = (0..8).map(|i| format!("participant-{i}")).collect();
    let record = lifecycle.create("stress", roster.clone()).await.unwrap();
    let session_id = record.session.id;
    lifecycle.activate(session_id).await.unwrap();

    let mut handles = Vec::new();
    for participant in &roster {
        let lifecycle = Arc::clone(&lifecycle);
        let participant = participant.clone();
        handles.push(tokio::spawn(async move {
            lifecycle
                .submit(session_id, 1, &participant, Uuid::new_v4(), "act")
                .await
                .unwrap()
        }));
    }

    let mut accepted = 0;
    let mut releases = 0;
    let mut resolutions = 0;
    for handle in handles {
        let report = handle.await.unwrap();
        match report.outcome {
            SubmissionOutcome::Accepted {
                barrier_released, ..
            } => {
                accepted += 1;
                if barrier_released {
                    releases += 1;
                }
            }
            other => panic!("distinct participants must all be accepted, got {other:?}"),
        }
        if report.resolution.is_some() {
            resolutions += 1;
        }
    }

    // All distinct submissions land; exactly one observes the release and
    // drives resolution — never zero, never more than one.
    assert_eq!(accepted, 8);
    assert_eq!(releases, 1);
    assert_eq!(resolutions, 1);
    assert_eq!(narrator.consequence_calls(), 1);

    // The next turn owes the full roster again.
    let status = lifecycle.status(session_id).await.unwrap();
    assert_eq!(status.turn_number, 2);
    assert_eq!(status.phase, Some(TurnPhase::AwaitingActions));
    assert_eq!(status.awaited, roster);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_duplicates_admit_one_action_and_never_release() {
    let (lifecycle, narrator) = lifecycle();
    let record = lifecycle
        .create("duplicates", vec!["Alya".to_owned(), "Borin".to_owned()])
        .await
        .unwrap();
    let session_id = record.session.id;
    lifecycle.activate(session_id).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..8 {
        let lifecycle = Arc::clone(&lifecycle);
        handles.push(tokio::spawn(async move {
            lifecycle
                .submit(session_id, 1, "Alya", Uuid::new_v4(), &format!("attempt {i}"))
                .await
                .unwrap()
        }));
    }

    let mut accepted = 0;
    let mut duplicates = 0;
    for handle in handles {
        match handle.await.unwrap().outcome {
            SubmissionOutcome::Accepted {
                barrier_released, ..
            } => {
                accepted += 1;
                assert!(!barrier_released);
            }
            SubmissionOutcome::DuplicateRejected { .. } => duplicates += 1,
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    assert_eq!(accepted, 1);
    assert_eq!(duplicates, 7);
    assert_eq!(narrator.consequence_calls(), 0);

    // Borin is still owed; the turn did not advance.
    let status = lifecycle.status(session_id).await.unwrap();
    assert_eq!(status.state, SessionState::Active);
    assert_eq!(status.turn_number, 1);
    assert_eq!(status.awaited, vec!["Borin"]);
}
