//! Error types for the runtime crate.

use thiserror::Error;

use notifier_store::StoreError;

/// Errors that can occur in the runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// A backing store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A message could not be delivered.
    #[error("send error: {0}")]
    Send(String),

    /// Runtime not started.
    #[error("runtime not started")]
    NotStarted,

    /// Runtime already started.
    #[error("runtime already started")]
    AlreadyStarted,

    /// Shutdown error.
    #[error("shutdown error: {0}")]
    Shutdown(String),
}

/// Result type for runtime operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;
