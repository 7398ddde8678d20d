//! Configuration management
//!
//! Everything is read from the environment once at startup (after an optional
//! `.env` file is loaded in `main`) into an immutable [`Config`].

use std::time::Duration;

use crate::channels::Author;
use crate::links::{AlternateTags, LinkConfig, MessageTemplate};
use crate::{Error, Result};

/// Default pause between getUpdates calls
const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Relay configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Telegram connection settings
    pub telegram: TelegramConfig,
    /// Link rewriting settings
    pub links: LinkConfig,
    /// Authors whose group messages are left alone
    pub ignore: IgnoreList,
    /// Template for group replacement messages
    pub group_template: MessageTemplate,
}

/// Telegram connection settings
#[derive(Clone)]
pub struct TelegramConfig {
    /// Bot API token
    pub bot_token: String,
    /// Chat that mirrors every group replacement (`@name` or numeric id)
    pub broadcast_channel: Option<String>,
    /// Pause between getUpdates calls
    pub poll_interval: Duration,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"[redacted]")
            .field("broadcast_channel", &self.broadcast_channel)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

impl Config {
    /// Load configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns error if a required variable is missing or a value is invalid
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// Returns error if a required variable is missing or a value is invalid
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bot_token = required(var, "TELEGRAM_BOT_TOKEN")?;
        let (links, group_template) = load_links(var)?;

        Ok(Self {
            telegram: TelegramConfig {
                bot_token,
                broadcast_channel: var("CHANNEL_NAME").map(|c| c.trim().to_string()),
                poll_interval: Duration::from_millis(number(
                    var,
                    "POLL_INTERVAL_MS",
                    DEFAULT_POLL_INTERVAL_MS,
                )?),
            },
            links,
            ignore: var("IGNORE_USERS")
                .map(|raw| IgnoreList::parse(&raw))
                .unwrap_or_default(),
            group_template,
        })
    }
}

/// Link settings and group template from the environment, without Telegram
///
/// # Errors
///
/// Returns error if `AMAZON_TAG` is missing or a value is invalid
pub fn links_from_env() -> Result<(LinkConfig, MessageTemplate)> {
    load_links(|key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty()))
}

fn load_links(var: impl Fn(&str) -> Option<String>) -> Result<(LinkConfig, MessageTemplate)> {
    let amazon_tag = required(&var, "AMAZON_TAG")?;

    let shorten_links = flag(&var, "SHORTEN_LINKS");
    let bitly_token = var("BITLY_TOKEN");
    if shorten_links && bitly_token.is_none() {
        return Err(Error::Config(
            "SHORTEN_LINKS is enabled but BITLY_TOKEN is not set".to_string(),
        ));
    }

    let alternate_tags = AlternateTags {
        enabled: flag(&var, "SUPPORT_ALTERNATE_TAG"),
        pool: var("ALTERNATE_TAGS")
            .map(|raw| split_list(&raw))
            .unwrap_or_default(),
        probability: var("ALTERNATE_TAG_PROBABILITY")
            .map(|raw| parse_probability(&raw))
            .transpose()?
            .unwrap_or(crate::links::DEFAULT_ALTERNATE_PROBABILITY),
    };

    let links = LinkConfig {
        amazon_tag,
        amazon_tld: var("AMAZON_TLD")
            .map_or_else(|| "com".to_string(), |tld| tld.trim().to_string()),
        raw_links: flag(&var, "RAW_LINKS"),
        check_for_redirects: flag(&var, "CHECK_FOR_REDIRECTS"),
        check_for_redirect_chains: flag(&var, "CHECK_FOR_REDIRECT_CHAINS"),
        max_redirect_chain_depth: number(
            &var,
            "MAX_REDIRECT_CHAIN_DEPTH",
            crate::links::DEFAULT_MAX_REDIRECT_DEPTH,
        )?,
        shorten_links,
        bitly_token,
        alternate_tags,
        timeout_secs: number(
            &var,
            "HTTP_TIMEOUT_SECS",
            crate::links::DEFAULT_HTTP_TIMEOUT_SECS,
        )?,
    };

    let group_template = var("GROUP_REPLACEMENT_MESSAGE")
        .map(|raw| MessageTemplate::parse(&raw))
        .unwrap_or_default();

    Ok((links, group_template))
}

fn required(var: impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    var(key).ok_or_else(|| Error::Config(format!("{key} is not set")))
}

/// `true` or `1`, case-insensitive; anything else (or unset) is off
fn flag(var: impl Fn(&str) -> Option<String>, key: &str) -> bool {
    var(key).is_some_and(|v| parse_bool(&v))
}

fn parse_bool(raw: &str) -> bool {
    let v = raw.trim();
    v.eq_ignore_ascii_case("true") || v == "1"
}

fn number<T: std::str::FromStr>(
    var: impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T> {
    var(key).map_or(Ok(default), |raw| {
        raw.trim().parse().map_err(|_| {
            Error::Config(format!("{key} must be a non-negative integer, got {raw:?}"))
        })
    })
}

/// A fraction in `[0, 1]`, or a percentage in `(1, 100]`
fn parse_probability(raw: &str) -> Result<f64> {
    let value: f64 = raw.trim().parse().map_err(|_| {
        Error::Config(format!("ALTERNATE_TAG_PROBABILITY must be a number, got {raw:?}"))
    })?;

    match value {
        v if (0.0..=1.0).contains(&v) => Ok(v),
        v if v > 1.0 && v <= 100.0 => Ok(v / 100.0),
        _ => Err(Error::Config(format!(
            "ALTERNATE_TAG_PROBABILITY must be between 0 and 1 (or 0 and 100), got {raw:?}"
        ))),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Authors whose group messages are never rewritten
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreList {
    ids: Vec<i64>,
    handles: Vec<String>,
}

impl IgnoreList {
    /// Parse a comma-separated list of numeric ids and `@handles`
    ///
    /// Handles may be given with or without the `@`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let mut list = Self::default();
        for entry in split_list(raw) {
            match entry.parse::<i64>() {
                Ok(id) => list.ids.push(id),
                Err(_) => list.handles.push(format!(
                    "@{}",
                    entry.trim_start_matches('@').to_lowercase()
                )),
            }
        }
        list
    }

    /// Whether `author` is on the list
    #[must_use]
    pub fn matches(&self, author: &Author) -> bool {
        self.ids.contains(&author.id)
            || author
                .handle()
                .is_some_and(|handle| self.handles.contains(&handle))
    }

    /// Whether the list has no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() && self.handles.is_empty()
    }
}
