//! Local caching of server reads.
//!
//! This module provides the `ProfileCache`, the client-side view of
//! `/users/me` that screens render from. Entries are considered stale
//! after 5 minutes or once explicitly invalidated.

pub mod manager;

pub use manager::{CachedData, ProfileCache};
