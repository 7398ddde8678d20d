//! Amazon URL detection in text
//!
//! Holds the URL-shape patterns the rewriter scans for:
//! - full product links carrying an ASIN
//! - `amzn.to` / `amzn.eu` short links
//! - generic URLs (candidates for redirect expansion)
//! - raw marketplace links for the configured TLD

use regex::Regex;
use std::sync::LazyLock;

use crate::Result;

/// Full Amazon product link; the `asin` group holds the product identifier
static FULL_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)https?://(([^\s]*)\.)?amazon\.([a-z.]{2,5})(/d/([^\s]*)|/([^\s]*)/?(?:dp|o|gp|-)/)(aw/d/|product/)?(?P<asin>B[0-9A-Z]{9})([^\s]*)",
    )
    .expect("valid regex")
});

/// Amazon short link; the `token` group holds the path after the domain (and `/d`)
static SHORT_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)https?://(([^\s]*)\.)?(amzn\.to|amzn\.eu)(/d)?/(?P<token>[0-9A-Za-z]+)")
        .expect("valid regex")
});

/// Any http(s) URL
static URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)https?://(www\.)?[-a-zA-Z0-9@:%._+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}\b([-a-zA-Z0-9()@:%_+.~#?&/=]*)",
    )
    .expect("valid regex")
});

/// A full product link found in text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FullLink<'a> {
    /// The matched URL
    pub text: &'a str,
    /// The ASIN captured from it
    pub asin: &'a str,
}

/// A short link found in text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortLink<'a> {
    /// The matched URL
    pub text: &'a str,
    /// Trailing path token, used as an ASIN surrogate
    pub token: &'a str,
}

/// Detect all full product links in a string, left to right
#[must_use]
pub fn detect_full_links(text: &str) -> Vec<FullLink<'_>> {
    FULL_URL_REGEX
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let asin = caps.name("asin")?;
            Some(FullLink {
                text: whole.as_str(),
                asin: asin.as_str(),
            })
        })
        .collect()
}

/// Detect all short links in a string, left to right
#[must_use]
pub fn detect_short_links(text: &str) -> Vec<ShortLink<'_>> {
    SHORT_URL_REGEX
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let token = caps.name("token")?;
            Some(ShortLink {
                text: whole.as_str(),
                token: token.as_str(),
            })
        })
        .collect()
}

/// Detect all URLs in a string
#[must_use]
pub fn detect_urls(text: &str) -> Vec<&str> {
    URL_REGEX.find_iter(text).map(|m| m.as_str()).collect()
}

/// Find the ASIN inside a full product URL
#[must_use]
pub fn find_asin(url: &str) -> Option<&str> {
    FULL_URL_REGEX
        .captures(url)
        .and_then(|caps| caps.name("asin"))
        .map(|m| m.as_str())
}

/// Extract the ASIN from a URL, returning the input unchanged when none is found
///
/// Callers treat a result equal to the input as "not found".
#[must_use]
pub fn extract_asin(url: &str) -> &str {
    find_asin(url).unwrap_or(url)
}

/// Whether `url` begins with a short link
#[must_use]
pub fn is_short_link(url: &str) -> bool {
    SHORT_URL_REGEX.find(url).is_some_and(|m| m.start() == 0)
}

/// Patterns that depend on the configured marketplace
#[derive(Debug, Clone)]
pub struct MarketplacePatterns {
    raw: Regex,
}

impl MarketplacePatterns {
    /// Build the patterns for a marketplace TLD
    ///
    /// # Errors
    ///
    /// Returns error if the TLD produces an invalid pattern
    pub fn new(tld: &str) -> Result<Self> {
        let raw = Regex::new(&format!(
            r"(?i)https?://(([^\s]*)\.)?amazon\.{}/?([^\s]*)",
            regex::escape(tld)
        ))?;
        Ok(Self { raw })
    }

    /// Detect all raw marketplace links in a string, left to right
    #[must_use]
    pub fn detect_raw_links<'a>(&self, text: &'a str) -> Vec<&'a str> {
        self.raw.find_iter(text).map(|m| m.as_str()).collect()
    }

    /// Whether `url` begins with a raw marketplace link
    #[must_use]
    pub fn is_raw_link(&self, url: &str) -> bool {
        self.raw.find(url).is_some_and(|m| m.start() == 0)
    }

    /// Whether `url` is already an Amazon link and needs no redirect expansion
    #[must_use]
    pub fn is_amazon_link(&self, url: &str) -> bool {
        is_short_link(url) || self.is_raw_link(url)
    }
}
