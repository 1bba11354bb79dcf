//! Command-line and environment configuration.

use std::time::Duration;

use clap::Parser;

use notifier_runtime::RuntimeConfig;

use crate::error::{Result, TelegramError};

/// Shop notifier - announces new orders and sheet products on Telegram
#[derive(Parser, Debug, Clone)]
#[command(name = "notifier-telegram")]
#[command(about = "Watches a product sheet and an order database, and notifies registered Telegram chats")]
pub struct Args {
    /// Bot token from @BotFather (also the webhook path)
    #[arg(long, env = "TELEGRAM_TOKEN", hide_env_values = true)]
    pub telegram_token: String,

    /// Spreadsheet key
    #[arg(long, env = "SHEET_ID")]
    pub sheet_id: String,

    /// Password users send with /login to register
    #[arg(long, env = "BOT_PASSWORD", hide_env_values = true)]
    pub bot_password: String,

    /// Product table name
    #[arg(long, env = "SHEET_NAME", default_value = "product")]
    pub sheet_name: String,

    /// Users table name
    #[arg(long, env = "USER_SHEET_NAME", default_value = "users")]
    pub user_sheet_name: String,

    /// MongoDB connection string; order monitoring is off without it
    #[arg(long, env = "DB_URL", hide_env_values = true)]
    pub db_url: Option<String>,

    /// Public base URL used to register the webhook
    #[arg(long, env = "SERVER_URL")]
    pub server_url: Option<String>,

    /// Base URL provided by the hosting platform, used when SERVER_URL is unset
    #[arg(long, env = "RENDER_EXTERNAL_URL", hide = true)]
    pub render_external_url: Option<String>,

    /// Listening port
    #[arg(short, long, env = "PORT", default_value = "10000")]
    pub port: u16,

    /// Service-account key JSON for the spreadsheet API
    #[arg(long, env = "GOOGLE_CREDENTIALS", hide_env_values = true)]
    pub google_credentials: Option<String>,

    /// Seconds between two polling cycles
    #[arg(long, env = "POLL_INTERVAL_SECS", default_value = "5")]
    pub poll_interval_secs: u64,

    /// Seconds to wait before the first cycle
    #[arg(long, env = "WARMUP_SECS", default_value = "10")]
    pub warmup_secs: u64,

    /// Copy every existing sheet product into the database at startup
    #[arg(
        long,
        env = "SYNC_PRODUCTS_ON_START",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub sync_products_on_start: bool,

    /// Verbose logging (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Reject values that parse but cannot work.
    pub fn validate(&self) -> Result<()> {
        if self.telegram_token.trim().is_empty() {
            return Err(TelegramError::NoToken);
        }
        if self.sheet_id.trim().is_empty() {
            return Err(TelegramError::Config("SHEET_ID is empty".to_string()));
        }
        if self.bot_password.trim().is_empty() {
            return Err(TelegramError::Config("BOT_PASSWORD is empty".to_string()));
        }
        Ok(())
    }

    /// Base URL for the webhook: `SERVER_URL`, else `RENDER_EXTERNAL_URL`.
    pub fn public_url(&self) -> Option<&str> {
        [&self.server_url, &self.render_external_url]
            .into_iter()
            .filter_map(|url| url.as_deref().map(str::trim))
            .find(|url| !url.is_empty())
    }

    pub fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig::new()
            .with_poll_interval(Duration::from_secs(self.poll_interval_secs))
            .with_warmup(Duration::from_secs(self.warmup_secs))
            .with_sync_products_on_start(self.sync_products_on_start)
    }

    /// Log filter for the `-v` count.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "notifier_telegram=info,notifier_runtime=info,notifier_store=info,teloxide=warn",
            1 => "notifier_telegram=debug,notifier_runtime=debug,notifier_store=debug,tower_http=debug,teloxide=info",
            2 => "notifier_telegram=trace,notifier_runtime=trace,notifier_store=trace,tower_http=trace,teloxide=debug",
            _ => "trace",
        }
    }
}
