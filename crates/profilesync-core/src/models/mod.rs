//! Data models exchanged with the backend.
//!
//! - `Profile`, `ProfilePatch`: the user's profile fields and edits to them
//! - `Credentials`, `Registration`, `RegistrationForm`: auth request bodies

pub mod auth;
pub mod profile;

pub use auth::{Credentials, Registration, RegistrationForm};
pub use profile::{Profile, ProfilePatch};
