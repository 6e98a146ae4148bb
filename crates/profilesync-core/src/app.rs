//! Wiring for a running client.
//!
//! `ProfileSync` owns one of everything (session store, request pipeline,
//! profile cache, optimistic updater, event bus) and exposes the flows the
//! screens need: sign in, sign up, sign out, read and edit the profile.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{error, info};

use crate::api::{ApiClient, ApiError, Operation};
use crate::auth::{CredentialStore, Session, SessionState, SessionStore};
use crate::cache::ProfileCache;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::events::{EventBus, NavigationEvent, Route};
use crate::gate::{AccessGate, GateDecision};
use crate::models::{Credentials, Profile, ProfilePatch, RegistrationForm};
use crate::mutation::{ProfileUpdater, UpdateOutcome};
use crate::notify::Notifier;
use crate::utils::validate::{validate_credentials, validate_registration};

const SIGNED_IN_MESSAGE: &str = "Welcome back!";
const REGISTERED_MESSAGE: &str = "Account created successfully! Welcome aboard!";

pub struct ProfileSync {
    sessions: Arc<SessionStore>,
    api: ApiClient,
    cache: Arc<ProfileCache>,
    updater: Arc<ProfileUpdater>,
    events: EventBus,
    notifier: Arc<dyn Notifier>,
}

impl ProfileSync {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        api_url: &str,
        timeout: Duration,
        notifier: Arc<dyn Notifier>,
    ) -> anyhow::Result<Self> {
        let sessions = Arc::new(SessionStore::new(store, notifier.clone()));
        let events = EventBus::new();
        let api = ApiClient::new(api_url, timeout, sessions.clone(), events.clone())?;
        let cache = Arc::new(ProfileCache::new());
        let updater = Arc::new(ProfileUpdater::new(
            sessions.clone(),
            api.clone(),
            cache.clone(),
            notifier.clone(),
        ));

        Ok(Self {
            sessions,
            api,
            cache,
            updater,
            events,
            notifier,
        })
    }

    pub fn from_config(config: &Config, notifier: Arc<dyn Notifier>) -> anyhow::Result<Self> {
        Self::new(
            config.credential_store()?,
            config.api_url(),
            config.request_timeout(),
            notifier,
        )
    }

    /// Hydrate the session store. Call once at startup.
    pub async fn start(&self) -> SessionState {
        let state = self.sessions.hydrate().await;
        info!(authenticated = state.is_authenticated(), "Session store ready");
        state
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn cache(&self) -> &Arc<ProfileCache> {
        &self.cache
    }

    pub fn updater(&self) -> &Arc<ProfileUpdater> {
        &self.updater
    }

    pub fn navigation(&self) -> broadcast::Receiver<NavigationEvent> {
        self.events.subscribe()
    }

    pub fn gate(&self) -> GateDecision {
        AccessGate::check(&self.sessions.state())
    }

    pub async fn sign_in(&self, credentials: &Credentials) -> Result<Session> {
        validate_credentials(credentials)?;
        let session = self
            .api
            .login(credentials)
            .await
            .inspect_err(|e| self.report(Operation::Login, e))?;
        self.establish(session.clone());
        self.notifier.success(SIGNED_IN_MESSAGE);
        Ok(session)
    }

    pub async fn sign_up(&self, form: &RegistrationForm) -> Result<Session> {
        validate_registration(form)?;
        let session = self
            .api
            .register(&form.to_registration())
            .await
            .inspect_err(|e| self.report(Operation::Register, e))?;
        self.establish(session.clone());
        self.notifier.success(REGISTERED_MESSAGE);
        Ok(session)
    }

    pub fn sign_out(&self) {
        self.sessions.logout();
        self.cache.clear();
        self.events.emit(NavigationEvent::replace(Route::Login));
    }

    /// The signed-in user's profile, from cache while fresh
    pub async fn profile(&self) -> Result<Profile> {
        if !self.sessions.is_authenticated() {
            error!("Profile read attempted without an authenticated session");
            return Err(Error::IllegalStateAccess("profile"));
        }
        Ok(self.cache.get_or_fetch(&self.api).await?)
    }

    pub async fn update_profile(&self, patch: ProfilePatch) -> Result<UpdateOutcome> {
        self.updater.submit(patch).await
    }

    fn report(&self, operation: Operation, error: &ApiError) {
        match error {
            ApiError::Unauthorized => self.notifier.error(operation.fallback_message()),
            other => self.notifier.error(&other.to_string()),
        }
    }

    fn establish(&self, session: Session) {
        // A new identity must not see the previous user's cached profile
        self.cache.clear();
        self.sessions.login(session);
        self.events.emit(NavigationEvent::replace(Route::Root));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryStore;
    use crate::notify::testing::RecordingNotifier;
    use crate::notify::NotificationLevel;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client(server: &MockServer) -> (ProfileSync, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let app = ProfileSync::new(
            Arc::new(MemoryStore::new()),
            &server.uri(),
            Duration::from_secs(10),
            notifier.clone(),
        )
        .unwrap();
        app.start().await;
        (app, notifier)
    }

    fn issued_session() -> ResponseTemplate {
        ResponseTemplate::new(200)
            .set_body_json(json!({"token": "t1", "profile": {"username": "alice"}}))
    }

    #[tokio::test]
    async fn test_sign_in_welcomes_user_back() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(issued_session())
            .mount(&server)
            .await;
        let (app, notifier) = client(&server).await;

        app.sign_in(&Credentials::new("a@b.com", "secret1"))
            .await
            .unwrap();

        assert_eq!(
            notifier.messages(),
            vec![
                (NotificationLevel::Success, "Login successful!".to_string()),
                (NotificationLevel::Success, SIGNED_IN_MESSAGE.to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_sign_up_welcomes_new_user() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/register"))
            .respond_with(issued_session())
            .mount(&server)
            .await;
        let (app, notifier) = client(&server).await;

        let form = RegistrationForm {
            username: "alice".to_string(),
            email: "a@b.com".to_string(),
            password: "Secret123".to_string(),
            confirm_password: "Secret123".to_string(),
        };
        app.sign_up(&form).await.unwrap();

        assert!(notifier.contains(NotificationLevel::Success, REGISTERED_MESSAGE));
        assert!(!notifier.contains(NotificationLevel::Success, SIGNED_IN_MESSAGE));
    }

    #[tokio::test]
    async fn test_failed_sign_in_reports_error_only() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({"error": {"message": "Invalid identifier or password"}})),
            )
            .mount(&server)
            .await;
        let (app, notifier) = client(&server).await;

        assert!(app
            .sign_in(&Credentials::new("a@b.com", "secret1"))
            .await
            .is_err());
        assert_eq!(
            notifier.messages(),
            vec![(
                NotificationLevel::Error,
                "Invalid identifier or password".to_string()
            )]
        );
    }
}
