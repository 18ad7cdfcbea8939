//! Result and error types for the core library

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message shown whenever the backend rejects the session token.
pub const SESSION_EXPIRED: &str = "Session expired. Please log in again.";

/// Core library error type
///
/// The API variants render the message shown to the player, so a caller can
/// print `err.to_string()` directly as a notice.
#[derive(Error, Debug)]
pub enum Error {
    /// 400 / 422, or input rejected before a request is made
    #[error("{0}")]
    Validation(String),

    /// 401
    #[error("Session expired. Please log in again.")]
    Unauthorized,

    /// 403
    #[error("You don't have permission to do that.")]
    Forbidden,

    /// 404
    #[error("{0}")]
    NotFound(String),

    /// 429
    #[error("Too many requests. Please slow down.")]
    RateLimited,

    /// 5xx
    #[error("Server error. Please try again later.")]
    Server { status: u16 },

    /// Any other non-success status
    #[error("{message}")]
    Api { status: u16, message: String },

    /// The request never produced a response. `reason` goes to the log only.
    #[error("Unable to reach SlotBazaar at {url}")]
    Network { url: String, reason: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Build the error for a non-success HTTP status.
    ///
    /// `detail` is whatever message the backend put in its body, if any.
    pub fn from_status(status: u16, detail: Option<String>) -> Self {
        match status {
            400 | 422 => Self::Validation(detail.unwrap_or_else(|| "Invalid request".to_string())),
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound(detail.unwrap_or_else(|| "Not found".to_string())),
            429 => Self::RateLimited,
            500..=599 => Self::Server { status },
            _ => Self::Api {
                status,
                message: detail.unwrap_or_else(|| format!("Request failed (HTTP {})", status)),
            },
        }
    }

    /// HTTP status this error corresponds to, when it came from (or stands in for) a response.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Validation(_) => Some(400),
            Self::Unauthorized => Some(401),
            Self::Forbidden => Some(403),
            Self::NotFound(_) => Some(404),
            Self::RateLimited => Some(429),
            Self::Server { status } | Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Diagnostic text kept out of the player-facing message
    pub fn details(&self) -> Option<&str> {
        match self {
            Self::Network { reason, .. } => Some(reason),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

impl From<duckdb::Error> for Error {
    fn from(e: duckdb::Error) -> Self {
        Self::Database(e.to_string())
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// JSON envelope for `--json` output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

impl<T> OperationResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            status_code: None,
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            status_code: None,
        }
    }
}

impl<T> From<Result<T>> for OperationResult<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => {
                let status_code = e.status_code();
                Self {
                    status_code,
                    ..Self::fail(e.to_string())
                }
            }
        }
    }
}
