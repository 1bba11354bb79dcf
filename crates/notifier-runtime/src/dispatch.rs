//! Outbound message delivery.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use notifier_core::Recipient;

use crate::error::{Result, RuntimeError};

/// Something that can deliver a Markdown message to a chat.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_markdown(&self, chat_id: &str, text: &str) -> Result<()>;
}

/// Best-effort fan-out over a [`Messenger`].
///
/// Failures are logged and counted, never retried.
#[derive(Clone)]
pub struct Dispatcher {
    messenger: Arc<dyn Messenger>,
}

impl Dispatcher {
    pub fn new(messenger: Arc<dyn Messenger>) -> Self {
        Self { messenger }
    }

    /// Send one message. Returns whether it was accepted.
    pub async fn send(&self, chat_id: &str, text: &str) -> bool {
        match self.messenger.send_markdown(chat_id, text).await {
            Ok(()) => {
                debug!(chat_id = %chat_id, "Message sent");
                true
            }
            Err(e) => {
                warn!(chat_id = %chat_id, error = %e, "Failed to send message");
                false
            }
        }
    }

    /// Send the same message to every recipient, one after the other.
    ///
    /// Returns the number of successful sends.
    pub async fn broadcast(&self, recipients: &[Recipient], text: &str) -> usize {
        let mut delivered = 0;
        for recipient in recipients {
            if self.send(&recipient.id, text).await {
                delivered += 1;
            }
        }
        delivered
    }
}

/// Messenger that records every message instead of sending it.
///
/// Chats passed to [`RecordingMessenger::fail_for`] reject their messages,
/// which still get recorded as attempts.
#[derive(Default)]
pub struct RecordingMessenger {
    attempts: Mutex<Vec<(String, String)>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn fail_for(&self, chat_id: impl Into<String>) {
        self.failing.lock().await.insert(chat_id.into());
    }

    /// Every `(chat_id, text)` pair attempted so far.
    pub async fn attempts(&self) -> Vec<(String, String)> {
        self.attempts.lock().await.clone()
    }

    /// Texts attempted towards one chat.
    pub async fn messages_to(&self, chat_id: &str) -> Vec<String> {
        self.attempts
            .lock()
            .await
            .iter()
            .filter(|(id, _)| id == chat_id)
            .map(|(_, text)| text.clone())
            .collect()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_markdown(&self, chat_id: &str, text: &str) -> Result<()> {
        self.attempts
            .lock()
            .await
            .push((chat_id.to_string(), text.to_string()));
        if self.failing.lock().await.contains(chat_id) {
            return Err(RuntimeError::Send(format!("chat {chat_id} rejected the message")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notifier_core::RecipientKind;

    #[tokio::test]
    async fn test_broadcast_counts_successes() {
        let messenger = Arc::new(RecordingMessenger::new());
        messenger.fail_for("2").await;
        let dispatcher = Dispatcher::new(messenger.clone());

        let recipients = vec![
            Recipient::new("1", "A", RecipientKind::User),
            Recipient::new("2", "B", RecipientKind::User),
            Recipient::new("-3", "C", RecipientKind::Group),
        ];

        let delivered = dispatcher.broadcast(&recipients, "hello").await;
        assert_eq!(delivered, 2);

        let attempts = messenger.attempts().await;
        let order: Vec<&str> = attempts.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(order, vec!["1", "2", "-3"]);
    }

    #[tokio::test]
    async fn test_send_reports_failure() {
        let messenger = Arc::new(RecordingMessenger::new());
        messenger.fail_for("9").await;
        let dispatcher = Dispatcher::new(messenger.clone());

        assert!(!dispatcher.send("9", "hi").await);
        assert!(dispatcher.send("10", "hi").await);
        assert_eq!(messenger.messages_to("9").await, vec!["hi".to_string()]);
    }
}
