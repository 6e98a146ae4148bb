//! API client for the profile backend.
//!
//! `ApiClient` is the only way the application talks to the backend. It
//! reads the bearer token from the `SessionStore` right before each request
//! and, when the backend answers 401, evicts the session and asks for a
//! redirect to the login page before returning to the caller.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use reqwest::{header, Client, Method, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::auth::{Session, SessionStore};
use crate::events::{EventBus, NavigationEvent, Route};
use crate::models::{Credentials, Profile, ProfilePatch, Registration};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Default base URL for a locally running backend
pub const DEFAULT_API_URL: &str = "http://localhost:1337/api";

/// HTTP request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// The calls the pipeline knows how to make
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Register,
    Login,
    FetchProfile,
    UpdateProfile,
}

impl Operation {
    /// Message used when the backend gives us nothing better
    pub fn fallback_message(&self) -> &'static str {
        match self {
            Operation::Register => "Registration failed",
            Operation::Login => "Login failed",
            Operation::FetchProfile => "Failed to fetch profile",
            Operation::UpdateProfile => "Update failed",
        }
    }

    fn method(&self) -> Method {
        match self {
            Operation::Register | Operation::Login => Method::POST,
            Operation::FetchProfile => Method::GET,
            Operation::UpdateProfile => Method::PUT,
        }
    }

    fn path(&self) -> &'static str {
        match self {
            Operation::Register => "/auth/register",
            Operation::Login => "/auth/login",
            Operation::FetchProfile | Operation::UpdateProfile => "/users/me",
        }
    }
}

/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    sessions: Arc<SessionStore>,
    events: EventBus,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        sessions: Arc<SessionStore>,
        events: EventBus,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            sessions,
            events,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ===== Auth =====

    /// Create an account. The returned session is not installed; that is
    /// the caller's decision.
    pub async fn register(&self, registration: &Registration) -> Result<Session, ApiError> {
        self.call(Operation::Register, self.sessions.token(), Some(registration))
            .await
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<Session, ApiError> {
        self.call(Operation::Login, self.sessions.token(), Some(credentials))
            .await
    }

    // ===== Profile =====

    pub async fn fetch_profile(&self) -> Result<Profile, ApiError> {
        self.call(Operation::FetchProfile, self.sessions.token(), None::<&()>)
            .await
    }

    /// Send profile changes with an explicit token, so an update keeps the
    /// credential it was started with.
    pub async fn update_profile(
        &self,
        token: &str,
        fields: &ProfilePatch,
    ) -> Result<Profile, ApiError> {
        self.call(Operation::UpdateProfile, Some(token.to_string()), Some(fields))
            .await
    }

    // ===== Pipeline =====

    fn url(&self, operation: Operation) -> String {
        format!("{}{}", self.base_url, operation.path())
    }

    /// A token that can't be encoded as a header is local garbage; the
    /// request goes out unauthenticated and the backend decides.
    fn auth_headers(&self, token: Option<&str>) -> header::HeaderMap {
        let mut headers = header::HeaderMap::new();
        if let Some(token) = token {
            match header::HeaderValue::from_str(&format!("Bearer {}", token)) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    headers.insert(header::AUTHORIZATION, value);
                }
                Err(e) => {
                    warn!(error = %e, "Stored token is not a valid header value, sending unauthenticated");
                }
            }
        }
        headers
    }

    async fn call<B, T>(
        &self,
        operation: Operation,
        token: Option<String>,
        body: Option<&B>,
    ) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(operation);
        debug!(?operation, url = %url, authenticated = token.is_some(), "Sending request");

        let mut request = self
            .client
            .request(operation.method(), &url)
            .headers(self.auth_headers(token.as_deref()));
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            warn!(?operation, error = %e, "Request failed");
            ApiError::request_failed(operation.fallback_message())
        })?;

        let response = self.check_response(operation, response).await?;

        response.json::<T>().await.map_err(|e| {
            warn!(?operation, error = %e, "Failed to parse response");
            ApiError::request_failed(operation.fallback_message())
        })
    }

    /// Check if response is successful, returning an error with the server's
    /// message if not. A 401 evicts the session before anything else runs.
    async fn check_response(
        &self,
        operation: Operation,
        response: Response,
    ) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            self.evict_session(operation);
            return Err(ApiError::Unauthorized);
        }

        let body = response.text().await.unwrap_or_default();
        warn!(
            ?operation,
            status = status.as_u16(),
            body = %ApiError::truncate_body(&body),
            "Request rejected"
        );
        Err(ApiError::from_status(status, &body, operation.fallback_message()))
    }

    fn evict_session(&self, operation: Operation) {
        warn!(?operation, "Backend rejected credentials, evicting session");
        self.sessions.evict();
        self.events.emit(NavigationEvent::replace(Route::Login));
    }
}
