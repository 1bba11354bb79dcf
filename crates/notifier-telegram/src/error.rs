//! Error types for the Telegram front end.

use thiserror::Error;

/// Errors that can occur while setting up or running the bot.
#[derive(Debug, Error)]
pub enum TelegramError {
    /// Bot token not provided.
    #[error("Telegram bot token not set. Set TELEGRAM_TOKEN environment variable.")]
    NoToken,

    /// Webhook registration failed.
    #[error("Failed to register webhook: {0}")]
    Webhook(String),

    /// Invalid or incomplete configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for Telegram operations.
pub type Result<T> = std::result::Result<T, TelegramError>;
