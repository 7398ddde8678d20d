//! Link shortening through Bitly

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Bitly v4 shorten endpoint
const BITLY_SHORTEN_URL: &str = "https://api-ssl.bitly.com/v4/shorten";

/// Domain requested for shortened links
const BITLY_DOMAIN: &str = "bit.ly";

/// Turns a long URL into a short one
#[async_trait]
pub trait Shortener: Send + Sync {
    /// Shorten `long_url`
    async fn shorten(&self, long_url: &str) -> Result<String>;
}

/// Bitly shorten request body
#[derive(Debug, Serialize)]
struct ShortenRequest<'a> {
    long_url: &'a str,
    domain: &'a str,
}

/// The part of the Bitly response we read
#[derive(Debug, Deserialize)]
struct ShortenResponse {
    link: Option<String>,
}

/// Bitly API client
#[derive(Clone)]
pub struct BitlyShortener {
    client: Client,
    token: String,
    endpoint: String,
}

impl BitlyShortener {
    /// Create a client with the given access token
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(token: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            token,
            endpoint: BITLY_SHORTEN_URL.to_string(),
        })
    }

    /// Point the client at a different endpoint
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl Shortener for BitlyShortener {
    async fn shorten(&self, long_url: &str) -> Result<String> {
        let request = ShortenRequest {
            long_url,
            domain: BITLY_DOMAIN,
        };

        let body = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Shorten(format!("Bitly request failed: {e}")))?
            .text()
            .await
            .map_err(|e| Error::Shorten(format!("failed to read Bitly response: {e}")))?;

        parse_shorten_response(&body)
    }
}

impl std::fmt::Debug for BitlyShortener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitlyShortener")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

/// Pull the short link out of a Bitly response body
///
/// # Errors
///
/// Returns error if the body is not JSON or has no `link` field
pub fn parse_shorten_response(body: &str) -> Result<String> {
    let response: ShortenResponse = serde_json::from_str(body)
        .map_err(|e| Error::Shorten(format!("unexpected Bitly response {body}: {e}")))?;

    response
        .link
        .ok_or_else(|| Error::Shorten(format!("error in Bitly response {body}")))
}
