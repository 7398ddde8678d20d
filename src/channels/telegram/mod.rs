//! Telegram channel adapter
//!
//! Long-polls the Bot API for messages and uses it to delete and re-post them

mod api;
pub mod dedup;
pub mod entities;
pub mod polling;
pub mod retry;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::mpsc;

use super::{Channel, IncomingMessage, OutgoingMessage};
use crate::{Error, Result};

pub use dedup::UpdateDedup;
pub use retry::RetryPolicy;
pub use types::ChatId;

/// Client timeout, longer than the getUpdates long-poll
const CLIENT_TIMEOUT_SECS: u64 = polling::LONG_POLL_TIMEOUT_SECS + 15;

/// Telegram channel adapter
#[derive(Clone)]
pub struct TelegramChannel {
    token: String,
    client: Client,
    message_tx: Option<mpsc::Sender<IncomingMessage>>,
    connected: bool,
    retry: RetryPolicy,
}

impl TelegramChannel {
    /// Create a new Telegram channel adapter
    #[must_use]
    pub fn new(token: String) -> Self {
        Self {
            token,
            client: build_client(),
            message_tx: None,
            connected: false,
            retry: RetryPolicy::default(),
        }
    }

    /// Create with a message receiver for polling mode
    ///
    /// Returns the channel and a receiver for incoming messages
    #[must_use]
    pub fn with_receiver(token: String) -> (Self, mpsc::Receiver<IncomingMessage>) {
        let (tx, rx) = mpsc::channel(100);
        let channel = Self {
            message_tx: Some(tx),
            ..Self::new(token)
        };
        (channel, rx)
    }
}

impl std::fmt::Debug for TelegramChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramChannel")
            .field("connected", &self.connected)
            .field("polling", &self.message_tx.is_some())
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

fn build_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(CLIENT_TIMEOUT_SECS))
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to default Telegram HTTP client");
            Client::new()
        })
}

fn parse_message_id(raw: &str) -> Result<i64> {
    raw.parse()
        .map_err(|_| Error::Channel(format!("Invalid message ID: {raw}")))
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn connect(&mut self) -> Result<()> {
        let me = self.get_me().await?;
        self.connected = true;
        tracing::info!(
            bot_id = me.id,
            username = me.username.as_deref().unwrap_or_default(),
            "Telegram channel connected"
        );
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.connected = false;
        tracing::info!("Telegram channel disconnected");
        Ok(())
    }

    async fn send(&self, message: OutgoingMessage) -> Result<()> {
        let chat_id = ChatId::parse(&message.channel_id);
        let reply_to = message
            .reply_to
            .as_deref()
            .map(parse_message_id)
            .transpose()?;

        match &message.photo {
            Some(photo) => {
                self.send_photo(&chat_id, photo, &message.content, reply_to)
                    .await
            }
            None => self.send_message(&chat_id, &message.content, reply_to).await,
        }
    }

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<()> {
        let chat_id = ChatId::parse(channel_id);
        let msg_id = parse_message_id(message_id)?;

        self.delete_message_by_id(&chat_id, msg_id).await
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
