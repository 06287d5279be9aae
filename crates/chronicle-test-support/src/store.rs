//! Test stores — failure-injecting `SessionStore` wrappers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use uuid::Uuid;

use chronicle_core::error::DomainError;
use chronicle_core::session::Session;
use chronicle_core::store::{SessionRecord, SessionStore};

/// A store wrapper whose first `failures` compare-and-swap calls lose a
/// fabricated version race before delegating to the wrapped store. Reads
/// and creates pass straight through. Used to exercise retry paths.
pub struct ConflictingSessionStore {
    inner: Arc<dyn SessionStore>,
    failures_remaining: AtomicU32,
}

impl ConflictingSessionStore {
    /// Wraps `inner`, injecting `failures` conflicts before the swaps
    /// start landing.
    #[must_use]
    pub fn new(inner: Arc<dyn SessionStore>, failures: u32) -> Self {
        Self {
            inner,
            failures_remaining: AtomicU32::new(failures),
        }
    }
}

#[async_trait]
impl SessionStore for ConflictingSessionStore {
    async fn create_session(&self, session: Session) -> Result<SessionRecord, DomainError> {
        self.inner.create_session(session).await
    }

    async fn load_session(&self, id: Uuid) -> Result<SessionRecord, DomainError> {
        self.inner.load_session(id).await
    }

    async fn compare_and_swap(&self, record: SessionRecord) -> Result<SessionRecord, DomainError> {
        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            // u32::MAX means "fail forever"; otherwise count down.
            if remaining != u32::MAX {
                self.failures_remaining.store(remaining - 1, Ordering::SeqCst);
            }
            return Err(DomainError::ConcurrencyConflict {
                session_id: record.session.id,
                expected: record.version,
                actual: record.version + 1,
            });
        }
        self.inner.compare_and_swap(record).await
    }
}
