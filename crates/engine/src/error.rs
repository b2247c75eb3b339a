//! The module contains the errors the engine can return.
//!
//! Every failure carries an [`ErrorCode`] so callers can branch on the kind
//! without matching on messages, and a short text suitable for a
//! notification via [`EngineError::user_message`].
use sea_orm::{ConnAcquireErr, DbErr};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable classification of engine failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    Unauthorized,
    InvalidInput,
    NotFound,
    PermissionDenied,
    QuotaExceeded,
    NetworkError,
    Timeout,
    RateLimited,
    ServerError,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::InvalidInput => "INVALID_INPUT",
            Self::NotFound => "NOT_FOUND",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::QuotaExceeded => "QUOTA_EXCEEDED",
            Self::NetworkError => "NETWORK_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::RateLimited => "RATE_LIMITED",
            Self::ServerError => "SERVER_ERROR",
        }
    }
}

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    PermissionDenied(String),
    #[error("{0}")]
    QuotaExceeded(String),
    #[error("{0}")]
    Unavailable(String),
    #[error("{0}")]
    Timeout(String),
    #[error("{0}")]
    RateLimited(String),
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
    /// Any other database failure; its text never reaches a notification.
    #[error(transparent)]
    Database(DbErr),
}

/// Database failures the user can act on get their own kind; the rest stay
/// opaque.
impl From<DbErr> for EngineError {
    fn from(err: DbErr) -> Self {
        let text = err.to_string().to_lowercase();
        match err {
            DbErr::RecordNotFound(_) => Self::NotFound("Resource not found".to_string()),
            DbErr::ConnectionAcquire(ConnAcquireErr::Timeout) => {
                Self::Timeout("Database is busy, try again".to_string())
            }
            DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => {
                Self::Unavailable("Service temporarily unavailable".to_string())
            }
            _ if text.contains("database is locked") || text.contains("database is busy") => {
                Self::Timeout("Database is busy, try again".to_string())
            }
            _ if text.contains("readonly") || text.contains("permission denied") => {
                Self::PermissionDenied("Access denied".to_string())
            }
            _ if text.contains("database or disk is full") => {
                Self::QuotaExceeded("Database quota exceeded".to_string())
            }
            other => Self::Database(other),
        }
    }
}

impl EngineError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Unauthorized(_) => ErrorCode::Unauthorized,
            Self::InvalidInput(_) | Self::InvalidCursor(_) => ErrorCode::InvalidInput,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::PermissionDenied(_) => ErrorCode::PermissionDenied,
            Self::QuotaExceeded(_) => ErrorCode::QuotaExceeded,
            Self::Unavailable(_) => ErrorCode::NetworkError,
            Self::Timeout(_) => ErrorCode::Timeout,
            Self::RateLimited(_) => ErrorCode::RateLimited,
            Self::Database(_) => ErrorCode::ServerError,
        }
    }

    /// Short human-readable text for a notification.
    pub fn user_message(&self) -> String {
        match self {
            Self::Database(_) => "Database error".to_string(),
            other => other.to_string(),
        }
    }

    pub(crate) fn unauthenticated() -> Self {
        Self::Unauthorized("User not authenticated".to_string())
    }

    pub(crate) fn entry_not_found() -> Self {
        Self::NotFound("Entry not found".to_string())
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Unauthorized(a), Self::Unauthorized(b)) => a == b,
            (Self::InvalidInput(a), Self::InvalidInput(b)) => a == b,
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::PermissionDenied(a), Self::PermissionDenied(b)) => a == b,
            (Self::QuotaExceeded(a), Self::QuotaExceeded(b)) => a == b,
            (Self::Unavailable(a), Self::Unavailable(b)) => a == b,
            (Self::Timeout(a), Self::Timeout(b)) => a == b,
            (Self::RateLimited(a), Self::RateLimited(b)) => a == b,
            (Self::InvalidCursor(a), Self::InvalidCursor(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
