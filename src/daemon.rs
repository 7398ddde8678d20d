//! Daemon - the main relay service
//!
//! Connects to Telegram, polls for messages and hands each one to the relay
//! handler on its own task until Ctrl-C.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::Result;
use crate::channels::{Channel, IncomingMessage, TelegramChannel};
use crate::config::Config;
use crate::links::LinkRewriter;
use crate::relay::RelayHandler;

/// The relay daemon
#[derive(Debug)]
pub struct Daemon {
    config: Arc<Config>,
    rewriter: Arc<LinkRewriter>,
}

impl Daemon {
    /// Create a new daemon instance
    ///
    /// # Errors
    ///
    /// Returns error if the link rewriter cannot be built from the config
    pub fn new(config: Config) -> Result<Self> {
        let rewriter = LinkRewriter::new(config.links.clone())?;

        Ok(Self {
            config: Arc::new(config),
            rewriter: Arc::new(rewriter),
        })
    }

    /// Run until Ctrl-C
    ///
    /// # Errors
    ///
    /// Returns error if Telegram rejects the bot token or polling cannot start
    pub async fn run(self) -> Result<()> {
        let (mut telegram, rx) =
            TelegramChannel::with_receiver(self.config.telegram.bot_token.clone());
        telegram.connect().await?;

        let poller = telegram.start_polling(self.config.telegram.poll_interval)?;

        let channel: Arc<dyn Channel> = Arc::new(telegram);
        let handler = Arc::new(RelayHandler::new(
            Arc::clone(&self.config),
            Arc::clone(&self.rewriter),
            channel,
        ));

        tracing::info!(
            tld = %self.config.links.amazon_tld,
            raw_links = self.config.links.raw_links,
            check_for_redirects = self.config.links.check_for_redirects,
            shorten = self.config.links.shorten_links,
            broadcast = self.config.telegram.broadcast_channel.as_deref().unwrap_or("none"),
            "affiliate relay running"
        );

        // Set up shutdown signal
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = shutdown_tx.send(()).await;
            }
        });

        dispatch_loop(handler, rx, shutdown_rx).await;

        poller.abort();
        tracing::info!("affiliate relay stopped");
        Ok(())
    }
}

/// Hand every incoming message to `handler` on its own task
///
/// Returns when shutdown is signalled or the message stream ends.
pub async fn dispatch_loop(
    handler: Arc<RelayHandler>,
    mut rx: mpsc::Receiver<IncomingMessage>,
    mut shutdown_rx: mpsc::Receiver<()>,
) {
    loop {
        tokio::select! {
            Some(()) = shutdown_rx.recv() => {
                tracing::info!("shutdown requested");
                break;
            }
            msg = rx.recv() => {
                let Some(msg) = msg else {
                    tracing::info!("message stream closed");
                    break;
                };
                let handler = Arc::clone(&handler);
                tokio::spawn(async move {
                    let outcome = handler.handle(&msg).await;
                    tracing::debug!(
                        chat_id = %msg.channel_id,
                        message_id = %msg.id,
                        ?outcome,
                        "message handled"
                    );
                });
            }
        }
    }
}
