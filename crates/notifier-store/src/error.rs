//! Error types for store operations.

use thiserror::Error;

/// Errors that can occur while talking to the spreadsheet or the document store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Transport-level failure or non-success HTTP status.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Token exchange with the identity provider failed.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Service-account credentials missing or unusable.
    #[error("credentials error: {0}")]
    Credentials(String),

    /// The named table does not exist in the spreadsheet.
    #[error("sheet not found: {0}")]
    SheetNotFound(String),

    /// An update matched no order.
    #[error("order not found: {0}")]
    OrderNotFound(String),

    /// Document store failure.
    #[error("database error: {0}")]
    Database(String),

    /// Backend deliberately failing (in-memory doubles).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Failed to serialize/deserialize data.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        StoreError::Http(e.to_string())
    }
}

impl From<mongodb::error::Error> for StoreError {
    fn from(e: mongodb::error::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for StoreError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        StoreError::Credentials(e.to_string())
    }
}
