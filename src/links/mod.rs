//! Amazon link rewriting
//!
//! Detects Amazon URLs in a message, expands short and redirecting links,
//! swaps in the affiliate tag and composes the replacement text.

pub mod affiliate;
pub mod compose;
mod config;
pub mod detector;
pub mod redirect;
pub mod shortener;

pub use affiliate::{TagSelector, build_product_url, retag_url, select_tag};
pub use compose::{MessageTemplate, Slot, SlotValues, compose};
pub use config::{
    AlternateTags, DEFAULT_ALTERNATE_PROBABILITY, DEFAULT_GROUP_TEMPLATE,
    DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_MAX_REDIRECT_DEPTH, LinkConfig,
};
pub use detector::{MarketplacePatterns, detect_urls, extract_asin, find_asin};
pub use redirect::{HttpProbe, ProbeResponse, RedirectProbe, RedirectResolution, RedirectResolver};
pub use shortener::{BitlyShortener, Shortener};

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::channels::ChatKind;
use crate::{Error, Result};

/// One link detected in a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkCandidate {
    /// Exact text to replace in the message
    pub matched_text: String,
    /// Product identifier, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asin: Option<String>,
    /// Destination of a short link (raw-link mode only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expanded_url: Option<String>,
}

impl LinkCandidate {
    /// Candidate rebuilt from its ASIN
    #[must_use]
    pub fn with_asin(matched_text: impl Into<String>, asin: impl Into<String>) -> Self {
        Self {
            matched_text: matched_text.into(),
            asin: Some(asin.into()),
            expanded_url: None,
        }
    }

    /// Candidate re-tagged as-is
    #[must_use]
    pub fn raw(matched_text: impl Into<String>) -> Self {
        Self {
            matched_text: matched_text.into(),
            asin: None,
            expanded_url: None,
        }
    }

    /// Short link re-tagged at its destination
    #[must_use]
    pub fn expanded(matched_text: impl Into<String>, expanded_url: impl Into<String>) -> Self {
        Self {
            matched_text: matched_text.into(),
            asin: None,
            expanded_url: Some(expanded_url.into()),
        }
    }

    /// The URL to re-tag when there is no ASIN
    #[must_use]
    pub fn source_url(&self) -> &str {
        self.expanded_url.as_deref().unwrap_or(&self.matched_text)
    }
}

/// A candidate with its final affiliate URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedLink {
    /// The detected link
    #[serde(flatten)]
    pub candidate: LinkCandidate,
    /// Affiliate URL replacing it
    pub url: String,
}

/// Result of rewriting one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    /// Text to publish
    pub text: String,
    /// Links that went into it, in detection order
    pub links: Vec<ResolvedLink>,
}

/// Who wrote a message and where, as far as composition cares
#[derive(Debug, Clone, Copy)]
pub struct ComposeContext<'a> {
    /// Group or private chat
    pub kind: ChatKind,
    /// Author mention for `{USER}`
    pub mention: &'a str,
    /// Group template
    pub template: &'a MessageTemplate,
}

/// Rewrites Amazon links in message text
pub struct LinkRewriter {
    config: LinkConfig,
    patterns: MarketplacePatterns,
    resolver: RedirectResolver,
    tags: TagSelector,
    shortener: Option<Arc<dyn Shortener>>,
}

impl LinkRewriter {
    /// Create a rewriter backed by real HTTP clients
    ///
    /// # Errors
    ///
    /// Returns error if an HTTP client cannot be built, or shortening is
    /// enabled without a Bitly token
    pub fn new(config: LinkConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let probe: Arc<dyn RedirectProbe> = Arc::new(HttpProbe::new(timeout)?);

        let shortener: Option<Arc<dyn Shortener>> = if config.shorten_links {
            let token = config.bitly_token.clone().ok_or_else(|| {
                Error::Config("SHORTEN_LINKS is enabled but BITLY_TOKEN is not set".to_string())
            })?;
            Some(Arc::new(BitlyShortener::new(token, timeout)?))
        } else {
            None
        };

        Self::with_services(config, probe, shortener)
    }

    /// Create a rewriter with explicit network collaborators
    ///
    /// # Errors
    ///
    /// Returns error if the marketplace patterns cannot be built
    pub fn with_services(
        config: LinkConfig,
        probe: Arc<dyn RedirectProbe>,
        shortener: Option<Arc<dyn Shortener>>,
    ) -> Result<Self> {
        let patterns = MarketplacePatterns::new(&config.amazon_tld)?;
        let resolver = RedirectResolver::new(
            probe,
            config.check_for_redirect_chains,
            config.max_redirect_chain_depth,
        );
        let tags = TagSelector::new(config.amazon_tag.clone(), config.alternate_tags.clone());

        Ok(Self {
            config,
            patterns,
            resolver,
            tags,
            shortener,
        })
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Rewrite a message body
    ///
    /// Returns `None` when the body holds no usable Amazon link.
    pub async fn rewrite(&self, body: &str, ctx: ComposeContext<'_>) -> Option<Rewrite> {
        let expanded = if self.config.check_for_redirects {
            self.expand_redirects(body).await
        } else {
            body.to_string()
        };

        let candidates = self.detect(&expanded).await;
        if candidates.is_empty() {
            return None;
        }

        let links = self.resolve_all(candidates).await;
        if links.is_empty() {
            return None;
        }

        let text = compose(ctx.kind, ctx.template, ctx.mention, &expanded, body, &links);
        Some(Rewrite { text, links })
    }

    /// Replace redirecting non-Amazon URLs with their destinations
    pub async fn expand_redirects(&self, text: &str) -> String {
        let urls: Vec<&str> = detect_urls(text)
            .into_iter()
            .filter(|url| !self.patterns.is_amazon_link(url))
            .collect();

        let mut resolutions = Vec::new();
        for url in urls {
            tracing::info!(url, "found non-Amazon URL");
            match self.resolver.resolve(url).await {
                Ok(resolution) => resolutions.push(resolution),
                Err(e) => tracing::warn!(url, error = %e, "redirect check failed"),
            }
        }

        let pairs: Vec<(&str, &str)> = resolutions
            .iter()
            .filter(|r| !r.final_url.is_empty() && !r.is_noop())
            .map(|r| (r.originating_short_url.as_str(), r.final_url.as_str()))
            .collect();
        compose::replace_matches(text, &pairs)
    }

    /// Find link candidates in detection order
    ///
    /// Full (or raw) links come first, then short links. Short links whose
    /// redirect cannot be resolved are dropped.
    pub async fn detect(&self, text: &str) -> Vec<LinkCandidate> {
        let mut candidates: Vec<LinkCandidate> = if self.config.raw_links {
            self.patterns
                .detect_raw_links(text)
                .into_iter()
                .map(LinkCandidate::raw)
                .collect()
        } else {
            detector::detect_full_links(text)
                .into_iter()
                .map(|link| LinkCandidate::with_asin(link.text, link.asin))
                .collect()
        };

        for short in detector::detect_short_links(text) {
            let resolution = match self.resolver.resolve(short.text).await {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(url = short.text, error = %e, "short URL could not be resolved");
                    continue;
                }
            };

            if self.config.raw_links {
                candidates.push(LinkCandidate::expanded(short.text, resolution.final_url));
                continue;
            }

            let asin = find_asin(&resolution.final_url).or_else(|| {
                tracing::debug!(
                    url = short.text,
                    destination = %resolution.final_url,
                    token = short.token,
                    "no ASIN at destination, using short link token"
                );
                Some(short.token).filter(|t| !t.is_empty())
            });

            if let Some(asin) = asin {
                candidates.push(LinkCandidate::with_asin(short.text, asin));
            } else {
                tracing::debug!(url = short.text, "short link dropped, no ASIN");
            }
        }

        candidates
    }

    /// Resolve every candidate, dropping the ones that yield no URL
    pub async fn resolve_all(&self, candidates: Vec<LinkCandidate>) -> Vec<ResolvedLink> {
        let mut links = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if let Some(url) = self.resolve_link(&candidate).await {
                links.push(ResolvedLink { candidate, url });
            }
        }
        links
    }

    /// Affiliate URL for one candidate
    pub async fn resolve_link(&self, candidate: &LinkCandidate) -> Option<String> {
        let tag = {
            let mut rng = rand::thread_rng();
            self.tags.pick(&mut rng).to_string()
        };

        let url = if let Some(asin) = &candidate.asin {
            build_product_url(&self.config.amazon_tld, asin, &tag)
        } else {
            match retag_url(candidate.source_url(), &tag) {
                Ok(url) => url,
                Err(e) => {
                    tracing::debug!(url = candidate.source_url(), error = %e, "cannot re-tag link");
                    return None;
                }
            }
        };

        Some(self.shorten_or_keep(url).await)
    }

    /// Shorten `url` if enabled, keeping it as-is on any failure
    async fn shorten_or_keep(&self, url: String) -> String {
        let Some(shortener) = &self.shortener else {
            return url;
        };

        match shortener.shorten(&url).await {
            Ok(short) => short,
            Err(e) => {
                tracing::warn!(url, error = %e, "shortening failed, using long link");
                url
            }
        }
    }
}

impl std::fmt::Debug for LinkRewriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkRewriter")
            .field("tld", &self.config.amazon_tld)
            .field("raw_links", &self.config.raw_links)
            .field("shorten", &self.shortener.is_some())
            .finish_non_exhaustive()
    }
}
