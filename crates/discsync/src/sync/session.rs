//! Active-session bookkeeping for list syncs.
//!
//! Only the most recently started session of a list type may write that
//! list's entries. Starting a new session supersedes the previous one; the
//! old session notices at its next store mutation and stops.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::entity::list_type::ListType;

/// Opaque identifier of one sync session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Exclusive right to mutate one list's entries, held for one mutation.
pub type WriterGuard = OwnedMutexGuard<()>;

/// Tracks the active session per list type.
pub struct SessionRegistry {
    active: Mutex<HashMap<ListType, SessionId>>,
    writers: HashMap<ListType, Arc<AsyncMutex<()>>>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self {
            active: Mutex::new(HashMap::new()),
            writers: ListType::ALL
                .into_iter()
                .map(|list_type| (list_type, Arc::new(AsyncMutex::new(()))))
                .collect(),
        }
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ListType, SessionId>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start a session for `list_type`, superseding any active one.
    pub fn begin(&self, list_type: ListType) -> SessionId {
        let session = SessionId::new();
        let previous = self.lock().insert(list_type, session);
        if let Some(previous) = previous {
            tracing::debug!(%list_type, %previous, %session, "Superseding active sync session");
        }
        session
    }

    /// Whether `session` is still the active session of `list_type`.
    pub fn is_active(&self, list_type: ListType, session: SessionId) -> bool {
        self.lock().get(&list_type) == Some(&session)
    }

    /// The active session of `list_type`, if any.
    pub fn active(&self, list_type: ListType) -> Option<SessionId> {
        self.lock().get(&list_type).copied()
    }

    /// Acquire the writer lock of `list_type` for `session`.
    ///
    /// Returns `None` if the session was superseded, either before the call
    /// or while waiting for the lock.
    pub async fn writer(&self, list_type: ListType, session: SessionId) -> Option<WriterGuard> {
        if !self.is_active(list_type, session) {
            return None;
        }

        let lock = Arc::clone(self.writers.get(&list_type)?);
        let guard = lock.lock_owned().await;

        self.is_active(list_type, session).then_some(guard)
    }

    /// Stop the active session of `list_type` without starting a new one.
    ///
    /// The cancelled session ends at its next page boundary, like a
    /// superseded one, and abandons any pending rate-limit retry. Returns
    /// the cancelled session, if any.
    pub fn cancel(&self, list_type: ListType) -> Option<SessionId> {
        let cancelled = self.lock().remove(&list_type);
        if let Some(session) = cancelled {
            tracing::debug!(%list_type, %session, "Cancelled sync session");
        }
        cancelled
    }

    /// End `session`. A no-op if it was already superseded.
    ///
    /// Returns true if the session was the active one.
    pub fn finish(&self, list_type: ListType, session: SessionId) -> bool {
        let mut active = self.lock();
        if active.get(&list_type) == Some(&session) {
            active.remove(&list_type);
            true
        } else {
            false
        }
    }
}

impl fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("active", &*self.lock())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_session_supersedes_older() {
        let registry = SessionRegistry::new();
        let first = registry.begin(ListType::Collection);
        let second = registry.begin(ListType::Collection);

        assert!(!registry.is_active(ListType::Collection, first));
        assert!(registry.is_active(ListType::Collection, second));
    }

    #[test]
    fn list_types_are_independent() {
        let registry = SessionRegistry::new();
        let collection = registry.begin(ListType::Collection);
        let wantlist = registry.begin(ListType::Wantlist);

        assert!(registry.is_active(ListType::Collection, collection));
        assert!(registry.is_active(ListType::Wantlist, wantlist));
    }

    #[test]
    fn finish_ignores_superseded_sessions() {
        let registry = SessionRegistry::new();
        let first = registry.begin(ListType::Wantlist);
        let second = registry.begin(ListType::Wantlist);

        assert!(!registry.finish(ListType::Wantlist, first));
        assert_eq!(registry.active(ListType::Wantlist), Some(second));

        assert!(registry.finish(ListType::Wantlist, second));
        assert_eq!(registry.active(ListType::Wantlist), None);
    }

    #[tokio::test]
    async fn cancel_stops_the_active_session() {
        let registry = SessionRegistry::new();
        let session = registry.begin(ListType::Collection);

        assert_eq!(registry.cancel(ListType::Collection), Some(session));
        assert!(!registry.is_active(ListType::Collection, session));
        assert!(registry.writer(ListType::Collection, session).await.is_none());
        assert!(!registry.finish(ListType::Collection, session));
        assert_eq!(registry.cancel(ListType::Collection), None);
    }

    #[tokio::test]
    async fn writer_is_denied_to_superseded_session() {
        let registry = SessionRegistry::new();
        let first = registry.begin(ListType::Collection);

        assert!(registry.writer(ListType::Collection, first).await.is_some());

        registry.begin(ListType::Collection);
        assert!(registry.writer(ListType::Collection, first).await.is_none());
    }

    #[tokio::test]
    async fn writer_rechecks_after_waiting_for_lock() {
        let registry = Arc::new(SessionRegistry::new());
        let first = registry.begin(ListType::Collection);
        let held = registry
            .writer(ListType::Collection, first)
            .await
            .expect("active session gets the writer");

        let waiter = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.writer(ListType::Collection, first).await.is_some() })
        };
        tokio::task::yield_now().await;

        registry.begin(ListType::Collection);
        drop(held);

        assert!(!waiter.await.unwrap());
    }
}
