//! Utility functions for string formatting and form validation.

pub mod format;
pub mod validate;

pub use format::truncate_string;
pub use validate::{is_valid_email, ValidationError};
