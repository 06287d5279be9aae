//! In-memory `SessionStore` with a versioned compare-and-swap contract.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;
use uuid::Uuid;

use chronicle_core::error::DomainError;
use chronicle_core::session::Session;
use chronicle_core::store::{SessionRecord, SessionStore};

/// In-memory session store.
///
/// Records are keyed by session id in a `DashMap`, so writers to different
/// sessions never contend on one global lock. `compare_and_swap` performs
/// its version check and replacement under the entry's shard guard, which
/// is never held across an await point — the trait methods do all their
/// work synchronously before returning.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    records: DashMap<Uuid, SessionRecord>,
}

impl InMemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create_session(&self, session: Session) -> Result<SessionRecord, DomainError> {
        let session_id = session.id;
        match self.records.entry(session_id) {
            Entry::Occupied(_) => Err(DomainError::SessionAlreadyExists(session_id)),
            Entry::Vacant(vacant) => {
                let mut record = SessionRecord::new(session);
                record.version = 1;
                vacant.insert(record.clone());
                debug!(%session_id, "session record created");
                Ok(record)
            }
        }
    }

    async fn load_session(&self, id: Uuid) -> Result<SessionRecord, DomainError> {
        self.records
            .get(&id)
            .map(|entry| entry.clone())
            .ok_or(DomainError::SessionNotFound(id))
    }

    async fn compare_and_swap(&self, record: SessionRecord) -> Result<SessionRecord, DomainError> {
        let session_id = record.session.id;
        let mut entry = self
            .records
            .get_mut(&session_id)
            .ok_or(DomainError::SessionNotFound(session_id))?;

        if entry.version != record.version {
            return Err(DomainError::ConcurrencyConflict {
                session_id,
                expected: record.version,
                actual: entry.version,
            });
        }

        let mut updated = record;
        updated.version += 1;
        *entry = updated.clone();
        debug!(%session_id, version = updated.version, "session record swapped");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chronicle_core::session::SessionState;

    use super::*;

    fn session() -> Session {
        Session::new(
            Uuid::new_v4(),
            "The Sunken Vault",
            vec!["Alya".to_owned(), "Borin".to_owned()],
        )
    }

    #[tokio::test]
    async fn test_create_then_load_round_trips() {
        let store = InMemorySessionStore::new();
        let session = session();
        let id = session.id;

        let created = store.create_session(session).await.unwrap();
        let loaded = store.load_session(id).await.unwrap();

        assert_eq!(created.version, 1);
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.session.id, id);
        assert!(loaded.turn.is_none());
    }

    #[tokio::test]
    async fn test_create_twice_is_rejected() {
        let store = InMemorySessionStore::new();
        let session = session();

        store.create_session(session.clone()).await.unwrap();
        let err = store.create_session(session).await.unwrap_err();

        assert!(matches!(err, DomainError::SessionAlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_load_missing_session_is_not_found() {
        let store = InMemorySessionStore::new();

        let err = store.load_session(Uuid::new_v4()).await.unwrap_err();

        assert!(matches!(err, DomainError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn test_swap_bumps_version_and_persists() {
        let store = InMemorySessionStore::new();
        let created = store.create_session(session()).await.unwrap();

        let mut checked_out = created.clone();
        checked_out.session.activate().unwrap();
        let updated = store.compare_and_swap(checked_out).await.unwrap();

        assert_eq!(updated.version, 2);
        let loaded = store.load_session(created.session.id).await.unwrap();
        assert_eq!(loaded.version, 2);
        assert_eq!(loaded.session.state, SessionState::Active);
    }

    #[tokio::test]
    async fn test_stale_swap_reports_conflict_with_both_versions() {
        let store = InMemorySessionStore::new();
        let created = store.create_session(session()).await.unwrap();

        // Two writers check out the same version; the first wins.
        let first = created.clone();
        let second = created.clone();
        store.compare_and_swap(first).await.unwrap();

        match store.compare_and_swap(second).await.unwrap_err() {
            DomainError::ConcurrencyConflict {
                expected, actual, ..
            } => {
                assert_eq!(expected, 1);
                assert_eq!(actual, 2);
            }
            other => panic!("expected ConcurrencyConflict, got {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_swaps_on_one_version_admit_exactly_one_winner() {
        let store = Arc::new(InMemorySessionStore::new());
        let created = store.create_session(session()).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            let checked_out = created.clone();
            handles.push(tokio::spawn(async move {
                store.compare_and_swap(checked_out).await.is_ok()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }

        assert_eq!(winners, 1);
        let loaded = store.load_session(created.session.id).await.unwrap();
        assert_eq!(loaded.version, 2);
    }
}
