use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, error, warn};

use super::credentials::{CredentialStore, SESSION_KEY};
use crate::error::{Error, Result};
use crate::models::Profile;
use crate::notify::Notifier;

/// The authenticated identity: a bearer token and the profile it belongs to.
///
/// Also the wire format of `/auth/login` and `/auth/register`, which is why
/// the legacy `jwt`/`user` spellings are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(alias = "jwt")]
    pub token: String,
    #[serde(alias = "user")]
    pub profile: Profile,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(token: impl Into<String>, profile: Profile) -> Self {
        Self {
            token: token.into(),
            profile,
            created_at: Utc::now(),
        }
    }

    /// Parse a session previously written by `SessionStore`
    pub fn from_stored(raw: &str) -> Result<Self> {
        let session: Session = serde_json::from_str(raw)
            .map_err(|e| Error::CorruptLocalSession(e.to_string()))?;
        if session.token.trim().is_empty() {
            return Err(Error::CorruptLocalSession("empty token".to_string()));
        }
        Ok(session)
    }

    pub fn age(&self) -> Duration {
        Utc::now() - self.created_at
    }
}

/// Lifecycle of the session store
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Credential store not read yet
    Hydrating,
    Unauthenticated,
    Authenticated(Session),
}

impl SessionState {
    pub fn is_hydrating(&self) -> bool {
        matches!(self, SessionState::Hydrating)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Authenticated(session) => Some(session),
            _ => None,
        }
    }
}

/// Single owner of "who is logged in".
///
/// State lives in a watch channel: reads are synchronous and always see the
/// last completed write, and consumers can `subscribe()` to await changes.
/// Only this type writes to the credential store.
pub struct SessionStore {
    store: Arc<dyn CredentialStore>,
    state: watch::Sender<SessionState>,
    notifier: Arc<dyn Notifier>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn CredentialStore>, notifier: Arc<dyn Notifier>) -> Self {
        let (state, _) = watch::channel(SessionState::Hydrating);
        Self {
            store,
            state,
            notifier,
        }
    }

    /// Load the persisted session. Corrupt or unreadable data is discarded
    /// and the store ends up unauthenticated; this never fails.
    pub async fn hydrate(&self) -> SessionState {
        self.state.send_replace(SessionState::Hydrating);

        let store = Arc::clone(&self.store);
        let read = tokio::task::spawn_blocking(move || store.get(SESSION_KEY)).await;

        let next = match read {
            Ok(Ok(Some(raw))) => match Session::from_stored(&raw) {
                Ok(session) => {
                    debug!(age_minutes = session.age().num_minutes(), "Session restored");
                    SessionState::Authenticated(session)
                }
                Err(e) => {
                    warn!(error = %e, "Discarding stored session");
                    self.remove_persisted();
                    SessionState::Unauthenticated
                }
            },
            Ok(Ok(None)) => {
                debug!("No stored session");
                SessionState::Unauthenticated
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Failed to read stored session, discarding it");
                self.remove_persisted();
                SessionState::Unauthenticated
            }
            Err(e) => {
                warn!(error = %e, "Session read task failed");
                SessionState::Unauthenticated
            }
        };

        self.state.send_replace(next.clone());
        next
    }

    /// Install a freshly issued session, replacing whatever was there.
    pub fn login(&self, session: Session) {
        self.persist(&session);
        self.state.send_replace(SessionState::Authenticated(session));
        self.notifier.success("Login successful!");
    }

    /// Sign out. Safe to call when already signed out; storage is cleared
    /// either way.
    pub fn logout(&self) {
        self.clear();
        self.notifier.info("Logged out successfully");
    }

    /// Forced sign-out after the backend rejected the token.
    pub fn evict(&self) {
        let was_authenticated = self.is_authenticated();
        self.clear();
        if was_authenticated {
            self.notifier
                .warning("Your session has expired. Please log in again.");
        }
    }

    /// Shallow-merge `fields` into the current profile and persist.
    pub fn update_profile(&self, fields: &Profile) -> Result<Session> {
        let mut updated = None;
        self.state.send_if_modified(|state| match state {
            SessionState::Authenticated(session) => {
                session.profile.merge(fields);
                updated = Some(session.clone());
                true
            }
            _ => false,
        });

        let Some(session) = updated else {
            error!("update_profile called without an authenticated session");
            return Err(Error::IllegalStateAccess("update_profile"));
        };
        self.persist(&session);
        Ok(session)
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn session(&self) -> Option<Session> {
        self.state.borrow().session().cloned()
    }

    pub fn token(&self) -> Option<String> {
        self.state.borrow().session().map(|s| s.token.clone())
    }

    pub fn profile(&self) -> Option<Profile> {
        self.state.borrow().session().map(|s| s.profile.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    fn clear(&self) {
        self.state.send_replace(SessionState::Unauthenticated);
        self.remove_persisted();
    }

    /// In-memory state stays authoritative if the write fails
    fn persist(&self, session: &Session) {
        let result = serde_json::to_string(session)
            .map_err(|e| e.to_string())
            .and_then(|raw| {
                self.store
                    .set(SESSION_KEY, &raw)
                    .map_err(|e| e.to_string())
            });
        if let Err(e) = result {
            warn!(error = %e, "Failed to persist session");
        }
    }

    fn remove_persisted(&self) {
        if let Err(e) = self.store.remove(SESSION_KEY) {
            warn!(error = %e, "Failed to remove stored session");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::credentials::{MemoryStore, StoreError};
    use crate::notify::testing::RecordingNotifier;
    use crate::notify::NotificationLevel;

    fn store_with(raw: Option<&str>) -> (Arc<MemoryStore>, SessionStore, Arc<RecordingNotifier>) {
        let backing = Arc::new(MemoryStore::new());
        if let Some(raw) = raw {
            backing.set(SESSION_KEY, raw).unwrap();
        }
        let notifier = Arc::new(RecordingNotifier::default());
        let sessions = SessionStore::new(backing.clone(), notifier.clone());
        (backing, sessions, notifier)
    }

    fn alice() -> Session {
        Session::new("t1", Profile::from_pairs([("username", "alice"), ("email", "a@b.com")]))
    }

    /// Backend that can never be read
    struct BrokenStore;

    impl CredentialStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(std::io::Error::other("disk on fire").into())
        }
        fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(std::io::Error::other("disk on fire").into())
        }
        fn remove(&self, _key: &str) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[test]
    fn test_starts_hydrating() {
        let (_, sessions, _) = store_with(None);
        assert!(sessions.state().is_hydrating());
        assert!(!sessions.is_authenticated());
    }

    #[tokio::test]
    async fn test_hydrate_empty_store() {
        let (_, sessions, _) = store_with(None);
        assert_eq!(sessions.hydrate().await, SessionState::Unauthenticated);
        // Calling again gives the same answer
        assert_eq!(sessions.hydrate().await, SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_hydrate_restores_session() {
        let raw = serde_json::to_string(&alice()).unwrap();
        let (_, sessions, _) = store_with(Some(&raw));

        let state = sessions.hydrate().await;
        assert_eq!(state.session().map(|s| s.token.as_str()), Some("t1"));
        assert_eq!(sessions.profile().unwrap().username(), Some("alice"));
    }

    #[tokio::test]
    async fn test_hydrate_discards_corrupt_data() {
        let corrupt = [
            "",
            "not json",
            "{",
            "null",
            "42",
            "[]",
            r#"{"token":"t1"}"#,
            r#"{"profile":{"username":"alice"}}"#,
            r#"{"token":"","profile":{}}"#,
            r#"{"token":5,"profile":{}}"#,
        ];
        for raw in corrupt {
            let (backing, sessions, _) = store_with(Some(raw));
            assert_eq!(sessions.hydrate().await, SessionState::Unauthenticated, "input: {raw:?}");
            assert!(backing.is_empty(), "corrupt entry kept for input {raw:?}");
        }
    }

    #[tokio::test]
    async fn test_hydrate_unreadable_store() {
        let sessions = SessionStore::new(Arc::new(BrokenStore), Arc::new(RecordingNotifier::default()));
        assert_eq!(sessions.hydrate().await, SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_login_logout_round_trip() {
        let (backing, sessions, notifier) = store_with(None);
        sessions.hydrate().await;

        sessions.login(alice());
        assert!(sessions.is_authenticated());
        assert_eq!(sessions.token().as_deref(), Some("t1"));
        let stored = backing.get(SESSION_KEY).unwrap().expect("session persisted");
        assert_eq!(Session::from_stored(&stored).unwrap().token, "t1");
        assert!(notifier.contains(NotificationLevel::Success, "Login successful!"));

        sessions.logout();
        assert_eq!(sessions.state(), SessionState::Unauthenticated);
        assert!(backing.is_empty());
        assert!(notifier.contains(NotificationLevel::Info, "Logged out successfully"));
    }

    #[tokio::test]
    async fn test_logout_when_signed_out_clears_storage() {
        let (backing, sessions, _) = store_with(None);
        sessions.hydrate().await;
        // Something left behind that the store never loaded
        backing.set(SESSION_KEY, "stale").unwrap();

        sessions.logout();
        assert_eq!(sessions.state(), SessionState::Unauthenticated);
        assert!(backing.is_empty());
    }

    #[tokio::test]
    async fn test_login_overwrites_existing_session() {
        let (_, sessions, _) = store_with(None);
        sessions.login(alice());
        sessions.login(Session::new("t2", Profile::from_pairs([("username", "bob")])));
        assert_eq!(sessions.token().as_deref(), Some("t2"));
        assert_eq!(sessions.profile().unwrap().username(), Some("bob"));
    }

    #[tokio::test]
    async fn test_update_profile_merges_and_persists() {
        let (backing, sessions, _) = store_with(None);
        sessions.login(alice());

        let session = sessions
            .update_profile(&Profile::from_pairs([("username", "alice2")]))
            .unwrap();
        assert_eq!(session.profile.username(), Some("alice2"));
        assert_eq!(session.profile.email(), Some("a@b.com"));
        assert_eq!(session.token, "t1");

        let stored = Session::from_stored(&backing.get(SESSION_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(stored.profile.username(), Some("alice2"));
    }

    #[tokio::test]
    async fn test_update_profile_requires_session() {
        let (backing, sessions, _) = store_with(None);
        sessions.hydrate().await;

        let err = sessions
            .update_profile(&Profile::from_pairs([("username", "x")]))
            .unwrap_err();
        assert!(matches!(err, Error::IllegalStateAccess(_)));
        assert!(backing.is_empty());
    }

    #[tokio::test]
    async fn test_persist_failure_keeps_memory_state() {
        let sessions = SessionStore::new(Arc::new(BrokenStore), Arc::new(RecordingNotifier::default()));
        sessions.login(alice());
        assert!(sessions.is_authenticated());
    }

    #[tokio::test]
    async fn test_evict_warns_only_when_signed_in() {
        let (backing, sessions, notifier) = store_with(None);
        sessions.hydrate().await;
        sessions.evict();
        assert!(notifier.messages().is_empty());

        sessions.login(alice());
        sessions.evict();
        assert_eq!(sessions.state(), SessionState::Unauthenticated);
        assert!(backing.is_empty());
        assert!(notifier
            .messages()
            .iter()
            .any(|(level, _)| *level == NotificationLevel::Warning));
    }

    #[tokio::test]
    async fn test_subscribers_see_transitions() {
        let (_, sessions, _) = store_with(None);
        let mut rx = sessions.subscribe();
        sessions.hydrate().await;
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), SessionState::Unauthenticated);

        sessions.login(alice());
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_authenticated());
    }

    #[test]
    fn test_session_accepts_legacy_wire_names() {
        let session: Session =
            serde_json::from_str(r#"{"jwt":"abc","user":{"id":1,"username":"alice"}}"#).unwrap();
        assert_eq!(session.token, "abc");
        assert_eq!(session.profile.username(), Some("alice"));
    }
}
