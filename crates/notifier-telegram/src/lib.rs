//! Telegram front end for the shop notifier.
//!
//! Delivers order and product notifications to registered chats, and serves
//! the webhook through which chats register.
//!
//! # Environment Variables
//!
//! Required:
//! - `TELEGRAM_TOKEN`: Bot token from @BotFather
//! - `SHEET_ID`: Spreadsheet key holding the product and users tables
//! - `BOT_PASSWORD`: Password for `/login`
//!
//! Optional:
//! - `GOOGLE_CREDENTIALS`: Service-account key JSON for the spreadsheet
//! - `DB_URL`: MongoDB connection string (enables order monitoring)
//! - `SERVER_URL` / `RENDER_EXTERNAL_URL`: Public base URL for the webhook
//! - `SHEET_NAME`, `USER_SHEET_NAME`: Table names (default `product`, `users`)
//! - `PORT`: Listening port (default 10000)
//!
//! # Commands
//!
//! - `/start` - Registration status, or how to register
//! - `/login <password>` - Register a private chat
//! - `/help` - Show available commands
//!
//! Groups are registered the first time any message reaches the bot from
//! them.

pub mod bot;
pub mod config;
pub mod error;
pub mod registration;
pub mod server;

pub use bot::{chat_target, register_webhook, webhook_url, TelegramMessenger};
pub use config::Args;
pub use error::{Result, TelegramError};
pub use registration::{classify, InboundMessage, Intent, Outcome, Registrar, WebhookUpdate};
pub use server::{create_router, AppState, HealthResponse, ServiceStatus};
