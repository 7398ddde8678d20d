//! Telegram polling mode: getUpdates loop and message conversion

use std::time::Duration;

use serde::Deserialize;
use tokio::sync::mpsc;

use super::dedup::UpdateDedup;
use super::entities::{TextLink, flatten_text_links};
use super::types::GetUpdatesRequest;
use crate::channels::{Author, ChatKind, IncomingMessage};
use crate::{Error, Result};

/// Seconds Telegram holds a getUpdates call open
pub const LONG_POLL_TIMEOUT_SECS: u64 = 30;

/// A single update from getUpdates
#[derive(Debug, Deserialize)]
pub struct PollingUpdate {
    update_id: i64,
    message: Option<PollingMessage>,
}

/// Message from a polling update
#[derive(Debug, Deserialize)]
struct PollingMessage {
    message_id: i64,
    chat: PollingChat,
    from: Option<PollingUser>,
    text: Option<String>,
    #[serde(default)]
    entities: Vec<PollingEntity>,
    caption: Option<String>,
    #[serde(default)]
    caption_entities: Vec<PollingEntity>,
    photo: Option<Vec<PollingPhotoSize>>,
    reply_to_message: Option<Box<RepliedMessage>>,
}

/// The message being replied to; only its id matters
#[derive(Debug, Deserialize)]
struct RepliedMessage {
    message_id: i64,
}

/// Formatting entity attached to text or a caption
#[derive(Debug, Deserialize)]
struct PollingEntity {
    #[serde(rename = "type")]
    kind: String,
    offset: usize,
    length: usize,
    url: Option<String>,
}

/// Photo size from polling
#[derive(Debug, Deserialize)]
struct PollingPhotoSize {
    file_id: String,
}

/// Chat info from polling
#[derive(Debug, Deserialize)]
struct PollingChat {
    id: i64,
    #[serde(rename = "type")]
    chat_type: String,
}

/// User info from polling
#[derive(Debug, Deserialize)]
struct PollingUser {
    id: i64,
    is_bot: bool,
    first_name: String,
    last_name: Option<String>,
    username: Option<String>,
}

impl super::TelegramChannel {
    /// Spawn a background task that polls Telegram's getUpdates API
    ///
    /// Forwards received messages into the receiver returned by
    /// `with_receiver`. Deletes any existing webhook before starting.
    ///
    /// # Errors
    ///
    /// Returns error if the channel was built without a receiver
    pub fn start_polling(&self, interval: Duration) -> Result<tokio::task::JoinHandle<()>> {
        let tx = self.message_tx.clone().ok_or_else(|| {
            Error::Channel("polling requires a channel built with with_receiver".to_string())
        })?;
        let channel = self.clone();

        Ok(tokio::spawn(async move {
            polling_loop(channel, tx, interval).await;
        }))
    }
}

/// Run the polling loop (background task)
///
/// Returns once the receiving side is dropped.
async fn polling_loop(
    channel: super::TelegramChannel,
    tx: mpsc::Sender<IncomingMessage>,
    interval: Duration,
) {
    if let Err(e) = channel.delete_webhook().await {
        tracing::warn!(error = %e, "failed to delete Telegram webhook before polling");
    }

    let mut offset: Option<i64> = None;
    let mut dedup = UpdateDedup::default();

    tracing::info!(?interval, "Telegram polling started");

    loop {
        let request = GetUpdatesRequest {
            timeout: LONG_POLL_TIMEOUT_SECS,
            allowed_updates: vec!["message"],
            offset,
        };

        match channel.call::<_, Vec<PollingUpdate>>("getUpdates", &request).await {
            Ok(updates) => {
                for update in &updates {
                    // Advance offset past this update
                    offset = Some(update.update_id + 1);

                    if dedup.is_duplicate(update.update_id) {
                        tracing::debug!(update_id = update.update_id, "skipping duplicate update");
                        continue;
                    }

                    let Some(msg) = update_to_incoming(update) else {
                        continue;
                    };

                    if tx.send(msg).await.is_err() {
                        tracing::info!("message receiver closed, stopping Telegram polling");
                        return;
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Telegram getUpdates error");
            }
        }

        if tx.is_closed() {
            return;
        }
        tokio::time::sleep(interval).await;
    }
}

/// Convert a polling update into an `IncomingMessage`
///
/// Skips updates without a message, bot authors, channel posts, commands and
/// messages that carry neither text nor a caption.
#[must_use]
pub fn update_to_incoming(update: &PollingUpdate) -> Option<IncomingMessage> {
    let msg = update.message.as_ref()?;

    let chat_kind = match msg.chat.chat_type.as_str() {
        "private" => ChatKind::Private,
        "group" | "supergroup" => ChatKind::Group,
        _ => return None,
    };

    let from = msg.from.as_ref().filter(|u| !u.is_bot)?;

    let (raw, entities, photo) = match (&msg.text, &msg.caption) {
        (Some(text), _) => (text, &msg.entities, None),
        (None, Some(caption)) => (
            caption,
            &msg.caption_entities,
            msg.photo
                .as_ref()
                .and_then(|sizes| sizes.last())
                .map(|p| p.file_id.clone()),
        ),
        (None, None) => return None,
    };

    if raw.starts_with('/') {
        return None;
    }

    let links: Vec<TextLink> = entities
        .iter()
        .filter(|e| e.kind == "text_link")
        .filter_map(|e| {
            e.url.as_ref().map(|url| TextLink {
                offset: e.offset,
                length: e.length,
                url: url.clone(),
            })
        })
        .collect();

    Some(IncomingMessage {
        id: msg.message_id.to_string(),
        channel_id: msg.chat.id.to_string(),
        chat_kind,
        author: Author {
            id: from.id,
            username: from.username.clone(),
            first_name: from.first_name.clone(),
            last_name: from.last_name.clone(),
        },
        content: flatten_text_links(raw, &links),
        photo,
        reply_to: msg
            .reply_to_message
            .as_ref()
            .map(|r| r.message_id.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: serde_json::Value) -> PollingUpdate {
        serde_json::from_value(json).unwrap()
    }

    fn user() -> serde_json::Value {
        serde_json::json!({
            "id": 99,
            "is_bot": false,
            "first_name": "Ada",
            "last_name": "Lovelace",
            "username": "ada"
        })
    }

    #[test]
    fn test_group_text_message() {
        let update = parse(serde_json::json!({
            "update_id": 1,
            "message": {
                "message_id": 10,
                "chat": {"id": -100, "type": "supergroup"},
                "from": user(),
                "text": "https://amzn.to/abc",
                "reply_to_message": {"message_id": 7, "chat": {"id": -100, "type": "supergroup"}}
            }
        }));

        let msg = update_to_incoming(&update).unwrap();
        assert_eq!(msg.id, "10");
        assert_eq!(msg.channel_id, "-100");
        assert_eq!(msg.chat_kind, ChatKind::Group);
        assert_eq!(msg.author.mention(), "@ada");
        assert_eq!(msg.content, "https://amzn.to/abc");
        assert_eq!(msg.reply_to.as_deref(), Some("7"));
        assert_eq!(msg.photo, None);
    }

    #[test]
    fn test_private_message() {
        let update = parse(serde_json::json!({
            "update_id": 2,
            "message": {
                "message_id": 11,
                "chat": {"id": 99, "type": "private"},
                "from": user(),
                "text": "hello"
            }
        }));

        let msg = update_to_incoming(&update).unwrap();
        assert_eq!(msg.chat_kind, ChatKind::Private);
        assert_eq!(msg.reply_to, None);
    }

    #[test]
    fn test_photo_caption_keeps_largest_photo() {
        let update = parse(serde_json::json!({
            "update_id": 3,
            "message": {
                "message_id": 12,
                "chat": {"id": -1, "type": "group"},
                "from": user(),
                "caption": "Deal: see here",
                "caption_entities": [
                    {"type": "text_link", "offset": 10, "length": 4, "url": "https://amzn.to/x"}
                ],
                "photo": [{"file_id": "small"}, {"file_id": "large"}]
            }
        }));

        let msg = update_to_incoming(&update).unwrap();
        assert_eq!(msg.content, "Deal: see https://amzn.to/x");
        assert_eq!(msg.photo.as_deref(), Some("large"));
    }

    #[test]
    fn test_text_link_entities_flattened() {
        let update = parse(serde_json::json!({
            "update_id": 4,
            "message": {
                "message_id": 13,
                "chat": {"id": -1, "type": "group"},
                "from": user(),
                "text": "buy it now",
                "entities": [
                    {"type": "bold", "offset": 0, "length": 3},
                    {
                        "type": "text_link",
                        "offset": 4,
                        "length": 2,
                        "url": "https://www.amazon.com/dp/B012345678"
                    }
                ]
            }
        }));

        let msg = update_to_incoming(&update).unwrap();
        assert_eq!(msg.content, "buy https://www.amazon.com/dp/B012345678 now");
    }

    #[test]
    fn test_skips_bots_commands_and_channels() {
        let bot = parse(serde_json::json!({
            "update_id": 5,
            "message": {
                "message_id": 1,
                "chat": {"id": -1, "type": "group"},
                "from": {"id": 1, "is_bot": true, "first_name": "Bot"},
                "text": "https://amzn.to/x"
            }
        }));
        assert!(update_to_incoming(&bot).is_none());

        let command = parse(serde_json::json!({
            "update_id": 6,
            "message": {
                "message_id": 2,
                "chat": {"id": 99, "type": "private"},
                "from": user(),
                "text": "/start"
            }
        }));
        assert!(update_to_incoming(&command).is_none());

        let channel_post = parse(serde_json::json!({
            "update_id": 7,
            "message": {
                "message_id": 3,
                "chat": {"id": -5, "type": "channel"},
                "text": "https://amzn.to/x"
            }
        }));
        assert!(update_to_incoming(&channel_post).is_none());
    }

    #[test]
    fn test_skips_messages_without_text() {
        let sticker = parse(serde_json::json!({
            "update_id": 8,
            "message": {
                "message_id": 4,
                "chat": {"id": -1, "type": "group"},
                "from": user(),
                "photo": [{"file_id": "p"}]
            }
        }));
        assert!(update_to_incoming(&sticker).is_none());

        let empty = parse(serde_json::json!({"update_id": 9}));
        assert!(update_to_incoming(&empty).is_none());
    }

    #[test]
    fn test_start_polling_requires_receiver() {
        let channel = super::super::TelegramChannel::new("1:a".to_string());
        assert!(channel.start_polling(Duration::from_millis(10)).is_err());
    }
}
