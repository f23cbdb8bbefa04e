use std::fmt;
use std::sync::{Arc, RwLock};

/// Credentials used to sign requests to the catalog service.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Account name; list endpoints are addressed by it.
    pub username: String,
    /// Opaque secret handed to the signer.
    pub token: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            token: token.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Shared holder of the current credentials.
///
/// An empty store makes every governed call fail with
/// [`ServiceError::Unauthenticated`](super::ServiceError::Unauthenticated)
/// without touching the network, until [`restore`](Self::restore) is called.
#[derive(Clone, Default)]
pub struct CredentialStore {
    inner: Arc<RwLock<Option<Credentials>>>,
}

impl CredentialStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `credentials`.
    pub fn with_credentials(credentials: Credentials) -> Self {
        let store = Self::new();
        store.restore(credentials);
        store
    }

    /// Current credentials, if any.
    pub fn current(&self) -> Option<Credentials> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Whether credentials are present.
    pub fn is_authenticated(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Install (or replace) credentials.
    pub fn restore(&self, credentials: Credentials) {
        tracing::debug!(username = %credentials.username, "Credentials restored");
        *self.inner.write().unwrap_or_else(|e| e.into_inner()) = Some(credentials);
    }

    /// Drop the stored credentials.
    pub fn invalidate(&self) {
        let previous = self.inner.write().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(previous) = previous {
            tracing::warn!(username = %previous.username, "Credentials invalidated");
        }
    }

    /// Drop the stored credentials only if they are still `rejected`.
    ///
    /// A rejection observed by a request signed with old credentials must not
    /// wipe credentials restored in the meantime. Returns true if the store
    /// was cleared.
    pub fn invalidate_if_current(&self, rejected: &Credentials) -> bool {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if guard.as_ref() == Some(rejected) {
            *guard = None;
            tracing::warn!(username = %rejected.username, "Credentials rejected by service");
            true
        } else {
            false
        }
    }
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_redacts_token() {
        let creds = Credentials::new("digger", "s3cret");
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("digger"));
        assert!(!rendered.contains("s3cret"));
    }

    #[test]
    fn restore_and_invalidate_round_trip() {
        let store = CredentialStore::new();
        assert!(!store.is_authenticated());

        store.restore(Credentials::new("digger", "token"));
        assert!(store.is_authenticated());
        assert_eq!(store.current().map(|c| c.username), Some("digger".to_string()));

        store.invalidate();
        assert!(store.current().is_none());
    }

    #[test]
    fn invalidate_if_current_ignores_stale_rejections() {
        let old = Credentials::new("digger", "old");
        let new = Credentials::new("digger", "new");
        let store = CredentialStore::with_credentials(new.clone());

        assert!(!store.invalidate_if_current(&old));
        assert_eq!(store.current(), Some(new.clone()));

        assert!(store.invalidate_if_current(&new));
        assert!(store.current().is_none());
    }

    #[test]
    fn clones_share_state() {
        let store = CredentialStore::new();
        let clone = store.clone();
        clone.restore(Credentials::new("digger", "token"));
        assert!(store.is_authenticated());
    }
}
