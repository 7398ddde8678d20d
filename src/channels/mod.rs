//! Messaging channel adapters
//!
//! The relay only needs to read messages, delete them and post replacements;
//! each platform implements the `Channel` trait for that.

pub mod telegram;

use async_trait::async_trait;

pub use telegram::TelegramChannel;

use crate::Result;

/// Kind of conversation a message arrived in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    /// One-to-one chat with the bot
    Private,
    /// Multi-party chat (group or supergroup)
    Group,
}

impl ChatKind {
    /// Whether this is a multi-party chat
    #[must_use]
    pub const fn is_group(self) -> bool {
        matches!(self, Self::Group)
    }
}

/// Author of an incoming message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    /// Numeric user id
    pub id: i64,
    /// Handle without the leading `@`
    pub username: Option<String>,
    /// First name
    pub first_name: String,
    /// Last name
    pub last_name: Option<String>,
}

impl Author {
    /// `@handle` if the author has one, otherwise their full name
    #[must_use]
    pub fn mention(&self) -> String {
        if let Some(username) = &self.username {
            return format!("@{username}");
        }
        match &self.last_name {
            Some(last) if !last.is_empty() => format!("{} {last}", self.first_name),
            _ => self.first_name.clone(),
        }
    }

    /// Lowercased `@handle`, used for ignore-list matching
    #[must_use]
    pub fn handle(&self) -> Option<String> {
        self.username
            .as_ref()
            .map(|u| format!("@{}", u.to_lowercase()))
    }
}

/// A message from a channel
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Message identifier (platform-specific)
    pub id: String,

    /// Channel identifier
    pub channel_id: String,

    /// Group or private chat
    pub chat_kind: ChatKind,

    /// Who sent it
    pub author: Author,

    /// Plain text (or photo caption) with rich-text links flattened to URLs
    pub content: String,

    /// Photo to re-send when `content` came from a photo caption
    pub photo: Option<String>,

    /// Message this is replying to (if any)
    pub reply_to: Option<String>,
}

/// A message to send to a channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    /// Channel identifier
    pub channel_id: String,

    /// Message content (plain text)
    pub content: String,

    /// Optional reply-to message ID
    pub reply_to: Option<String>,

    /// Photo to send with `content` as its caption
    pub photo: Option<String>,
}

impl OutgoingMessage {
    /// Create a simple `text` message
    #[must_use]
    pub fn text(channel_id: String, content: String) -> Self {
        Self {
            channel_id,
            content,
            reply_to: None,
            photo: None,
        }
    }

    /// Create a `reply` message
    #[must_use]
    pub fn reply(channel_id: String, content: String, reply_to: String) -> Self {
        Self {
            channel_id,
            content,
            reply_to: Some(reply_to),
            photo: None,
        }
    }

    /// Attach a photo, turning the content into its caption
    #[must_use]
    pub fn with_photo(mut self, photo: Option<String>) -> Self {
        self.photo = photo;
        self
    }

    /// Set the reply target
    #[must_use]
    pub fn replying_to(mut self, reply_to: Option<String>) -> Self {
        self.reply_to = reply_to;
        self
    }

    /// Same message addressed to another channel, without a reply target
    #[must_use]
    pub fn mirrored_to(&self, channel_id: &str) -> Self {
        Self {
            channel_id: channel_id.to_string(),
            content: self.content.clone(),
            reply_to: None,
            photo: self.photo.clone(),
        }
    }
}

/// Trait for messaging channel adapters
#[async_trait]
pub trait Channel: Send + Sync {
    /// Get the channel name
    fn name(&self) -> &'static str;

    /// Connect to the channel
    async fn connect(&mut self) -> Result<()>;

    /// Disconnect from the channel
    async fn disconnect(&mut self) -> Result<()>;

    /// Send a message
    async fn send(&self, message: OutgoingMessage) -> Result<()>;

    /// Delete a message
    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<()>;

    /// Check if connected
    fn is_connected(&self) -> bool;
}
