//! Error types for Quire

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Missing or malformed caller input
    #[error("Validation error: {0}")]
    Validation(String),

    /// No credential, or a credential the auth provider rejected
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Authenticated principal is not allowed to act on the target
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The payment provider answered with a non-success status
    #[error("Payment gateway error ({status}): {message}")]
    Gateway {
        status: u16,
        message: String,
        details: serde_json::Value,
    },

    /// A required secret or endpoint is not configured
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Ledger read/write failures (the store was unreachable or rejected the statement)
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Pool(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
