//! Shared test utilities

#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use affiliate_relay::channels::{Author, Channel, ChatKind, IncomingMessage, OutgoingMessage};
use affiliate_relay::config::Config;
use affiliate_relay::links::shortener::parse_shorten_response;
use affiliate_relay::links::{LinkRewriter, ProbeResponse, RedirectProbe, Shortener};
use affiliate_relay::{Error, RelayHandler, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;

/// Mock channel recording every delete and send
#[derive(Default)]
pub struct MockChannel {
    pub sent: Mutex<Vec<OutgoingMessage>>,
    pub deleted: Mutex<Vec<(String, String)>>,
    pub fail_delete: bool,
    pub fail_channel: Option<String>,
}

impl MockChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Channel whose deletes fail, like a bot without admin rights
    pub fn without_delete_rights() -> Arc<Self> {
        Arc::new(Self {
            fail_delete: true,
            ..Self::default()
        })
    }

    /// Channel where sends to `channel_id` fail
    pub fn failing_for(channel_id: &str) -> Arc<Self> {
        Arc::new(Self {
            fail_channel: Some(channel_id.to_string()),
            ..Self::default()
        })
    }

    pub async fn sent(&self) -> Vec<OutgoingMessage> {
        self.sent.lock().await.clone()
    }

    pub async fn deleted(&self) -> Vec<(String, String)> {
        self.deleted.lock().await.clone()
    }
}

#[async_trait]
impl Channel for MockChannel {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn connect(&mut self) -> Result<()> {
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        Ok(())
    }

    async fn send(&self, message: OutgoingMessage) -> Result<()> {
        if self.fail_channel.as_deref() == Some(message.channel_id.as_str()) {
            return Err(Error::Channel(
                "Telegram sendMessage error: 400 - chat not found".to_string(),
            ));
        }
        self.sent.lock().await.push(message);
        Ok(())
    }

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<()> {
        if self.fail_delete {
            return Err(Error::Channel(
                "Telegram deleteMessage error: 400 - message can't be deleted".to_string(),
            ));
        }
        self.deleted
            .lock()
            .await
            .push((channel_id.to_string(), message_id.to_string()));
        Ok(())
    }

    fn is_connected(&self) -> bool {
        true
    }
}

/// Probe answering from a fixed table; unknown URLs answer 200
#[derive(Default)]
pub struct TableProbe {
    routes: HashMap<String, ProbeResponse>,
    failing: Vec<String>,
}

impl TableProbe {
    pub fn new(redirects: &[(&str, &str)]) -> Self {
        let routes = redirects
            .iter()
            .map(|(from, to)| {
                (
                    (*from).to_string(),
                    ProbeResponse {
                        status: 301,
                        location: Some((*to).to_string()),
                    },
                )
            })
            .collect();
        Self {
            routes,
            failing: Vec::new(),
        }
    }

    /// Make probes of `url` fail at the transport level
    pub fn failing(mut self, url: &str) -> Self {
        self.failing.push(url.to_string());
        self
    }
}

#[async_trait]
impl RedirectProbe for TableProbe {
    async fn probe(&self, url: &str) -> Result<ProbeResponse> {
        if self.failing.iter().any(|f| f == url) {
            return Err(Error::Redirect(format!("connection refused: {url}")));
        }
        Ok(self.routes.get(url).cloned().unwrap_or(ProbeResponse {
            status: 200,
            location: None,
        }))
    }
}

/// Shortener answering with a fixed Bitly response body
pub struct CannedShortener {
    body: String,
    pub calls: Mutex<Vec<String>>,
}

impl CannedShortener {
    pub fn link(link: &str) -> Arc<Self> {
        Self::body(&serde_json::json!({ "link": link }).to_string())
    }

    pub fn body(body: &str) -> Arc<Self> {
        Arc::new(Self {
            body: body.to_string(),
            calls: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl Shortener for CannedShortener {
    async fn shorten(&self, long_url: &str) -> Result<String> {
        self.calls.lock().await.push(long_url.to_string());
        parse_shorten_response(&self.body)
    }
}

/// Config from `pairs` on top of the required token and tag
pub fn config(pairs: &[(&str, &str)]) -> Config {
    let mut env: HashMap<String, String> =
        [("TELEGRAM_BOT_TOKEN", "1:test"), ("AMAZON_TAG", "mytag-20")]
            .iter()
            .chain(pairs)
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
    env.retain(|_, v| !v.is_empty());
    Config::from_lookup(|key| env.get(key).cloned()).expect("valid test config")
}

/// Relay handler wired to mocks
pub fn handler(
    config: Config,
    probe: TableProbe,
    shortener: Option<Arc<dyn Shortener>>,
    channel: Arc<MockChannel>,
) -> RelayHandler {
    let rewriter = LinkRewriter::with_services(config.links.clone(), Arc::new(probe), shortener)
        .expect("valid rewriter");
    RelayHandler::new(Arc::new(config), Arc::new(rewriter), channel)
}

pub fn author(id: i64, username: Option<&str>) -> Author {
    Author {
        id,
        username: username.map(String::from),
        first_name: "Ada".to_string(),
        last_name: Some("Lovelace".to_string()),
    }
}

pub fn group_message(text: &str, author: Author) -> IncomingMessage {
    IncomingMessage {
        id: "10".to_string(),
        channel_id: "-100".to_string(),
        chat_kind: ChatKind::Group,
        author,
        content: text.to_string(),
        photo: None,
        reply_to: None,
    }
}

pub fn private_message(text: &str) -> IncomingMessage {
    IncomingMessage {
        id: "5".to_string(),
        channel_id: "42".to_string(),
        chat_kind: ChatKind::Private,
        author: author(42, Some("ada")),
        content: text.to_string(),
        photo: None,
        reply_to: None,
    }
}

/// Formatted log output collected by [`capture_logs`]
#[derive(Clone, Default)]
pub struct LogCapture(Arc<std::sync::Mutex<Vec<u8>>>);

impl LogCapture {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Route this thread's logs into a buffer until the guard drops
pub fn capture_logs() -> (LogCapture, DefaultGuard) {
    let capture = LogCapture::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(capture.clone())
        .with_ansi(false)
        .without_time()
        .finish();
    (capture, tracing::subscriber::set_default(subscriber))
}
