//! Core library for profilesync.
//!
//! A client for an account backend that keeps one signed-in session,
//! attaches its token to every request, and edits the user's profile
//! optimistically:
//!
//! - [`auth`]: `SessionStore` and the credential stores it persists to
//! - [`api`]: the authenticated request pipeline
//! - [`gate`]: the access gate for protected views
//! - [`cache`]: the cached profile view screens read from
//! - [`mutation`]: optimistic profile updates with rollback
//! - [`app`]: `ProfileSync`, which wires all of the above together

pub mod api;
pub mod app;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod gate;
pub mod models;
pub mod mutation;
pub mod notify;
pub mod utils;

pub use api::{ApiClient, ApiError};
pub use app::ProfileSync;
pub use auth::{CredentialStore, Session, SessionState, SessionStore};
pub use cache::ProfileCache;
pub use config::Config;
pub use error::{Error, Result};
pub use events::{EventBus, NavigationEvent, Route};
pub use gate::{AccessGate, GateDecision};
pub use models::{Credentials, Profile, ProfilePatch, RegistrationForm};
pub use mutation::{ProfileUpdater, TicketState, UpdateOutcome};
pub use notify::{NotificationLevel, Notifier, TracingNotifier};
