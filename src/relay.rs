//! Per-message relay: filter, rewrite, delete and re-post
//!
//! Every failure inside [`RelayHandler::handle`] is logged and swallowed so a
//! single bad message never stops the dispatch loop.

use std::sync::Arc;

use crate::Result;
use crate::channels::{Channel, IncomingMessage, OutgoingMessage};
use crate::config::Config;
use crate::links::{ComposeContext, LinkRewriter, ResolvedLink};

/// Where to report unexpected per-message failures
pub const BUG_REPORT_URL: &str = "https://github.com/gioxx/telegram-bot-amazon-python";

/// What happened to one incoming message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Author is on the ignore list
    Ignored,
    /// No usable Amazon link, message left alone
    NoLinks,
    /// Replacement posted
    Relayed {
        /// Links that were rewritten
        links: Vec<ResolvedLink>,
        /// Whether the original was deleted
        deleted: bool,
    },
    /// Processing failed, message left alone
    Dropped,
}

/// Handles incoming messages for one channel
pub struct RelayHandler {
    config: Arc<Config>,
    rewriter: Arc<LinkRewriter>,
    channel: Arc<dyn Channel>,
}

impl RelayHandler {
    /// Create a handler
    #[must_use]
    pub fn new(
        config: Arc<Config>,
        rewriter: Arc<LinkRewriter>,
        channel: Arc<dyn Channel>,
    ) -> Self {
        Self {
            config,
            rewriter,
            channel,
        }
    }

    /// Process one message
    pub async fn handle(&self, msg: &IncomingMessage) -> RelayOutcome {
        match self.process(msg).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    chat_id = %msg.channel_id,
                    message_id = %msg.id,
                    "ERROR, please file a bug report at {BUG_REPORT_URL}"
                );
                RelayOutcome::Dropped
            }
        }
    }

    async fn process(&self, msg: &IncomingMessage) -> Result<RelayOutcome> {
        let mention = msg.author.mention();

        if msg.chat_kind.is_group() && self.config.ignore.matches(&msg.author) {
            tracing::info!(
                chat_id = %msg.channel_id,
                "Ignored message from {mention} because it is included in the IGNORE_USERS env variable"
            );
            return Ok(RelayOutcome::Ignored);
        }

        let ctx = ComposeContext {
            kind: msg.chat_kind,
            mention: &mention,
            template: &self.config.group_template,
        };

        let Some(rewrite) = self.rewriter.rewrite(&msg.content, ctx).await else {
            tracing::debug!(chat_id = %msg.channel_id, message_id = %msg.id, "no Amazon links");
            return Ok(RelayOutcome::NoLinks);
        };

        let deleted = self.dispatch(msg, rewrite.text).await?;

        let suffix = if deleted { " (original message deleted)" } else { "" };
        for link in &rewrite.links {
            let target = link.candidate.asin.as_deref().unwrap_or(&link.url);
            tracing::info!(
                chat_id = %msg.channel_id,
                url = %link.url,
                "Long URL {} -> ASIN {target} from {mention}{suffix}",
                link.candidate.matched_text
            );
        }

        Ok(RelayOutcome::Relayed {
            links: rewrite.links,
            deleted,
        })
    }

    /// Publish the replacement, returning whether the original was deleted
    async fn dispatch(&self, msg: &IncomingMessage, text: String) -> Result<bool> {
        if !msg.chat_kind.is_group() {
            let reply = OutgoingMessage::reply(msg.channel_id.clone(), text, msg.id.clone());
            self.channel.send(reply).await?;
            return Ok(false);
        }

        self.channel.delete_message(&msg.channel_id, &msg.id).await?;

        let replacement = OutgoingMessage::text(msg.channel_id.clone(), text)
            .with_photo(msg.photo.clone())
            .replying_to(msg.reply_to.clone());
        let mirror = self
            .config
            .telegram
            .broadcast_channel
            .as_deref()
            .map(|channel| replacement.mirrored_to(channel));

        self.channel.send(replacement).await?;

        if let Some(mirror) = mirror {
            let target = mirror.channel_id.clone();
            if let Err(e) = self.channel.send(mirror).await {
                tracing::warn!(
                    error = %e,
                    channel = %target,
                    "failed to mirror to broadcast channel"
                );
            }
        }

        Ok(true)
    }
}

impl std::fmt::Debug for RelayHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayHandler")
            .field("channel", &self.channel.name())
            .field("rewriter", &self.rewriter)
            .finish_non_exhaustive()
    }
}
