//! Recipient registration from inbound chat updates.
//!
//! Groups register themselves by sending anything once the bot is in them.
//! Private chats register with `/login <password>`. The directory is the only
//! state: whether a chat is registered is always read from it, never cached.

use std::sync::Arc;

use serde::Deserialize;
use teloxide::utils::command::BotCommands;
use tracing::{debug, info};

use notifier_core::{Recipient, RecipientKind};
use notifier_runtime::Dispatcher;
use notifier_store::{RecipientDirectory, StoreError};

/// Commands understood in private chats.
#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "Check your registration status")]
    Start,

    #[command(description = "Register for notifications: /login <password>")]
    Login,

    #[command(description = "Show this help")]
    Help,
}

const GROUP_REGISTERED: &str = "✅ This group is now registered for notifications!";
const USER_REGISTERED: &str =
    "✅ Registered! You will be notified about new orders and new products.";
const ALREADY_REGISTERED: &str = "⚠️ You are already registered.";
const ONLINE: &str = "👋 You are online and registered for notifications.";

/// The subset of a Telegram update the handler reads.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookUpdate {
    pub message: Option<UpdateMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateMessage {
    pub chat: UpdateChat,
    pub from: Option<UpdateSender>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateChat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateSender {
    pub first_name: Option<String>,
}

/// Kind of chat a message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    Group,
    Other,
}

/// A chat message reduced to what registration needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub chat_id: String,
    pub chat_kind: ChatKind,
    /// Group title, else the sender's first name, else "User".
    pub display_name: String,
    /// Trimmed text, empty for non-text messages.
    pub text: String,
}

impl WebhookUpdate {
    /// `None` for updates that carry no message.
    pub fn into_inbound(self) -> Option<InboundMessage> {
        let message = self.message?;
        let chat_kind = match message.chat.kind.as_str() {
            "private" => ChatKind::Private,
            "group" | "supergroup" => ChatKind::Group,
            _ => ChatKind::Other,
        };
        let display_name = message
            .chat
            .title
            .or_else(|| message.from.and_then(|sender| sender.first_name))
            .unwrap_or_else(|| "User".to_string());

        Some(InboundMessage {
            chat_id: message.chat.id.to_string(),
            chat_kind,
            display_name,
            text: message.text.unwrap_or_default().trim().to_string(),
        })
    }
}

/// What a message asks for, before the directory is consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    RegisterGroup,
    Login,
    Start,
    Help,
    Ignore,
}

/// Classify a message. A login only counts when the text is exactly
/// `/login <password>` and a password is configured.
pub fn classify(message: &InboundMessage, password: &str) -> Intent {
    match message.chat_kind {
        ChatKind::Group => Intent::RegisterGroup,
        ChatKind::Other => Intent::Ignore,
        ChatKind::Private => {
            let text = message.text.as_str();
            if !password.is_empty() && text == login_command(password) {
                Intent::Login
            } else if text.starts_with("/start") {
                Intent::Start
            } else if text.starts_with("/help") {
                Intent::Help
            } else {
                Intent::Ignore
            }
        }
    }
}

fn login_command(password: &str) -> String {
    format!("/login {password}")
}

/// What handling a message did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    GroupRegistered,
    GroupKnown,
    UserRegistered,
    AlreadyRegistered,
    SentInstructions,
    SentStatus,
    SentHelp,
    Ignored,
}

/// Applies the registration rules against a directory.
pub struct Registrar {
    directory: Arc<dyn RecipientDirectory>,
    dispatcher: Dispatcher,
    password: String,
}

impl Registrar {
    pub fn new(
        directory: Arc<dyn RecipientDirectory>,
        dispatcher: Dispatcher,
        password: impl Into<String>,
    ) -> Self {
        Self {
            directory,
            dispatcher,
            password: password.into(),
        }
    }

    /// Handle one message. Replies are best-effort; a directory failure is
    /// returned and nothing is sent.
    pub async fn handle(&self, message: InboundMessage) -> Result<Outcome, StoreError> {
        let outcome = match classify(&message, &self.password) {
            Intent::Ignore => Outcome::Ignored,
            Intent::RegisterGroup => {
                let recipient =
                    Recipient::new(&message.chat_id, &message.display_name, RecipientKind::Group);
                if self.directory.register(recipient).await? {
                    self.dispatcher.send(&message.chat_id, GROUP_REGISTERED).await;
                    Outcome::GroupRegistered
                } else {
                    Outcome::GroupKnown
                }
            }
            Intent::Login => {
                let recipient =
                    Recipient::new(&message.chat_id, &message.display_name, RecipientKind::User);
                if self.directory.register(recipient).await? {
                    self.dispatcher.send(&message.chat_id, USER_REGISTERED).await;
                    Outcome::UserRegistered
                } else {
                    self.dispatcher.send(&message.chat_id, ALREADY_REGISTERED).await;
                    Outcome::AlreadyRegistered
                }
            }
            Intent::Start => {
                if self.directory.contains(&message.chat_id).await? {
                    self.dispatcher.send(&message.chat_id, ONLINE).await;
                    Outcome::SentStatus
                } else {
                    self.dispatcher.send(&message.chat_id, &self.instructions()).await;
                    Outcome::SentInstructions
                }
            }
            Intent::Help => {
                self.dispatcher.send(&message.chat_id, &help_text()).await;
                Outcome::SentHelp
            }
        };

        match outcome {
            Outcome::GroupRegistered | Outcome::UserRegistered => info!(
                chat_id = %message.chat_id,
                name = %message.display_name,
                outcome = ?outcome,
                "New recipient registered"
            ),
            _ => debug!(chat_id = %message.chat_id, outcome = ?outcome, "Handled chat message"),
        }
        Ok(outcome)
    }

    fn instructions(&self) -> String {
        format!(
            "🔒 This bot is private.\n\nRegister with:\n`{}`",
            login_command(&self.password)
        )
    }
}

fn help_text() -> String {
    Command::descriptions().to_string()
}
