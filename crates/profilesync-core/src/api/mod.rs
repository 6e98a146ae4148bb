//! Authenticated request pipeline for the profile backend.
//!
//! Every outbound call goes through `ApiClient`, which attaches the current
//! session's bearer token and evicts the session when the backend answers
//! 401. Non-2xx responses become `ApiError`s carrying the server's message
//! or a fixed per-operation fallback.

pub mod client;
pub mod error;

pub use client::{ApiClient, Operation};
pub use error::ApiError;
