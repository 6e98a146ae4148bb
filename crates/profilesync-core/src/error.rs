use thiserror::Error;

use crate::api::ApiError;
use crate::auth::StoreError;
use crate::utils::ValidationError;

#[derive(Error, Debug)]
pub enum Error {
    /// The credential store held something that is not a session.
    /// Recovered by discarding it; never shown to the user.
    #[error("Stored session is corrupt: {0}")]
    CorruptLocalSession(String),

    /// An authenticated-only operation was called without a session.
    /// Callers are expected to go through the access gate first.
    #[error("{0} requires an authenticated session")]
    IllegalStateAccess(&'static str),

    #[error("A profile update is already in progress")]
    MutationInFlight,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
