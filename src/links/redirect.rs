//! Bounded redirect resolution for short and redirecting links

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::LOCATION;

use crate::{Error, Result};

/// Status codes treated as redirects
const REDIRECT_STATUSES: [u16; 5] = [301, 302, 303, 307, 308];

/// Status and `Location` header of a single probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    /// HTTP status code
    pub status: u16,
    /// Raw `Location` header, if any
    pub location: Option<String>,
}

impl ProbeResponse {
    /// Whether the status is one of the followed redirect codes
    #[must_use]
    pub fn is_redirect(&self) -> bool {
        REDIRECT_STATUSES.contains(&self.status)
    }
}

/// Issues one request without following redirects
#[async_trait]
pub trait RedirectProbe: Send + Sync {
    /// Request `url` and report status plus `Location`
    async fn probe(&self, url: &str) -> Result<ProbeResponse>;
}

/// `reqwest`-backed probe with redirect following disabled
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client,
}

impl HttpProbe {
    /// Create a probe with the given per-request timeout
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .user_agent("Mozilla/5.0 (compatible; AffiliateRelay/0.1)")
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RedirectProbe for HttpProbe {
    async fn probe(&self, url: &str) -> Result<ProbeResponse> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Redirect(format!("request to {url} failed: {e}")))?;

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        Ok(ProbeResponse {
            status: response.status().as_u16(),
            location,
        })
    }
}

/// Result of following one redirect chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectResolution {
    /// Where the chain ended
    pub final_url: String,
    /// The URL the chain started from
    pub originating_short_url: String,
}

impl RedirectResolution {
    /// Whether the chain went anywhere
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.final_url == self.originating_short_url
    }
}

/// Follows redirects up to a fixed depth
#[derive(Clone)]
pub struct RedirectResolver {
    probe: Arc<dyn RedirectProbe>,
    follow_chains: bool,
    max_depth: u32,
}

impl RedirectResolver {
    /// Create a resolver
    ///
    /// With `follow_chains` off only the first hop is taken; with it on, at
    /// most `max_depth` hops are taken (always at least one request).
    #[must_use]
    pub fn new(probe: Arc<dyn RedirectProbe>, follow_chains: bool, max_depth: u32) -> Self {
        Self {
            probe,
            follow_chains,
            max_depth,
        }
    }

    /// Resolve `url` to its destination
    ///
    /// A non-redirect response is not an error: the URL reached so far is
    /// returned as the final URL.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure or a redirect without `Location`
    pub async fn resolve(&self, url: &str) -> Result<RedirectResolution> {
        let mut current = url.to_string();
        let mut depth: u32 = 0;

        loop {
            let response = self.probe.probe(&current).await?;

            if !response.is_redirect() {
                return Ok(RedirectResolution {
                    final_url: current,
                    originating_short_url: url.to_string(),
                });
            }

            let location = response.location.ok_or_else(|| {
                Error::Redirect(format!(
                    "{current} answered {} without a Location header",
                    response.status
                ))
            })?;
            let next = absolutize(&current, &location);

            depth += 1;
            if self.follow_chains && depth < self.max_depth {
                tracing::debug!(from = %current, to = %next, depth, "following redirect");
                current = next;
                continue;
            }

            return Ok(RedirectResolution {
                final_url: next,
                originating_short_url: url.to_string(),
            });
        }
    }
}

impl std::fmt::Debug for RedirectResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedirectResolver")
            .field("follow_chains", &self.follow_chains)
            .field("max_depth", &self.max_depth)
            .finish_non_exhaustive()
    }
}

/// Resolve a possibly relative `Location` against the URL that produced it
fn absolutize(base: &str, location: &str) -> String {
    url::Url::parse(base)
        .and_then(|b| b.join(location))
        .map_or_else(|_| location.to_string(), String::from)
}
