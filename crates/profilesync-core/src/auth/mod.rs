//! Session ownership and credential persistence.
//!
//! This module provides:
//! - `SessionStore`: the single writer of session state (hydrate, login, logout, update)
//! - `CredentialStore`: durable storage for the serialized session, backed by
//!   the OS keychain (`KeyringStore`), a JSON file (`FileStore`) or memory
//!
//! Sessions have no client-side expiry; the backend decides, and a 401 from
//! the request pipeline evicts the session.

pub mod credentials;
pub mod session;

pub use credentials::{CredentialStore, FileStore, KeyringStore, MemoryStore, StoreError, SESSION_KEY};
pub use session::{Session, SessionState, SessionStore};
