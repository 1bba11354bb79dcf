//! Bot API delivery and webhook registration.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ParseMode, Recipient as ChatTarget};
use tracing::info;
use url::Url;

use notifier_runtime::{Messenger, RuntimeError};

use crate::error::{Result, TelegramError};

/// Sends notifier messages through the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            bot: Bot::new(token),
        }
    }

    pub fn bot(&self) -> &Bot {
        &self.bot
    }
}

/// Numeric identifiers are chat ids; anything else is a channel username.
pub fn chat_target(chat_id: &str) -> ChatTarget {
    let chat_id = chat_id.trim();
    match chat_id.parse::<i64>() {
        Ok(id) => ChatTarget::Id(ChatId(id)),
        Err(_) if chat_id.starts_with('@') => ChatTarget::ChannelUsername(chat_id.to_string()),
        Err(_) => ChatTarget::ChannelUsername(format!("@{chat_id}")),
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    #[allow(deprecated)]
    async fn send_markdown(&self, chat_id: &str, text: &str) -> notifier_runtime::Result<()> {
        self.bot
            .send_message(chat_target(chat_id), text)
            .parse_mode(ParseMode::Markdown)
            .await
            .map_err(|e| RuntimeError::Send(e.to_string()))?;
        Ok(())
    }
}

/// `<base>/<token>`, the address Telegram posts updates to.
pub fn webhook_url(base: &str, token: &str) -> Result<Url> {
    let raw = format!("{}/{}", base.trim().trim_end_matches('/'), token);
    Url::parse(&raw).map_err(|e| TelegramError::Webhook(format!("invalid webhook URL: {e}")))
}

/// Point the bot's webhook at `url`.
pub async fn register_webhook(bot: &Bot, url: Url) -> Result<()> {
    bot.set_webhook(url.clone())
        .await
        .map_err(|e| TelegramError::Webhook(e.to_string()))?;
    info!(base = %url.origin().ascii_serialization(), "Webhook registered");
    Ok(())
}
