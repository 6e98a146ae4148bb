use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::utils::truncate_string;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The backend rejected the credential. By the time a caller sees this
    /// the session has already been evicted.
    #[error("Unauthorized - session has been signed out")]
    Unauthorized,

    #[error("{message}")]
    RequestFailed {
        status: Option<u16>,
        message: String,
    },
}

/// Maximum length for error response bodies in log output
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// `{ "error": { "message": "..." } }`
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    pub fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            format!(
                "{} (truncated, {} total bytes)",
                truncate_string(body, MAX_ERROR_BODY_LENGTH),
                body.len()
            )
        }
    }

    /// Pull the human-readable message out of an error body, if there is one
    pub fn server_message(body: &str) -> Option<String> {
        serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.error.message)
            .filter(|m| !m.trim().is_empty())
    }

    pub fn from_status(status: StatusCode, body: &str, fallback: &str) -> Self {
        if status == StatusCode::UNAUTHORIZED {
            return ApiError::Unauthorized;
        }
        ApiError::RequestFailed {
            status: Some(status.as_u16()),
            message: Self::server_message(body).unwrap_or_else(|| fallback.to_string()),
        }
    }

    /// A failure with no usable response (transport error, undecodable body)
    pub fn request_failed(fallback: &str) -> Self {
        ApiError::RequestFailed {
            status: None,
            message: fallback.to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized => Some(StatusCode::UNAUTHORIZED.as_u16()),
            ApiError::RequestFailed { status, .. } => *status,
        }
    }
}
