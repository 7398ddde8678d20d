//! Link rewriting configuration

use serde::{Deserialize, Serialize};

/// Default probability of picking an alternate tag
pub const DEFAULT_ALTERNATE_PROBABILITY: f64 = 0.35;

/// Default bound on followed redirects
pub const DEFAULT_MAX_REDIRECT_DEPTH: u32 = 2;

/// Default timeout for redirect and Bitly requests, in seconds
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Default group template
pub const DEFAULT_GROUP_TEMPLATE: &str =
    "Message by {USER} with Amazon affiliate link:\\n\\n{MESSAGE}";

/// Configuration for link detection and rewriting
#[derive(Clone, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
#[serde(default)]
pub struct LinkConfig {
    /// Primary affiliate tag
    pub amazon_tag: String,
    /// Marketplace top-level domain (e.g. "com", "it", "co.uk")
    pub amazon_tld: String,
    /// Preserve and re-tag the whole URL instead of rebuilding it from the ASIN
    pub raw_links: bool,
    /// Expand non-Amazon URLs that may redirect to Amazon
    pub check_for_redirects: bool,
    /// Follow redirect chains instead of stopping at the first hop
    pub check_for_redirect_chains: bool,
    /// Maximum number of followed redirects per chain
    pub max_redirect_chain_depth: u32,
    /// Shorten rewritten links through Bitly
    pub shorten_links: bool,
    /// Bitly access token
    #[serde(skip)]
    pub bitly_token: Option<String>,
    /// Weighted alternate-tag selection
    pub alternate_tags: AlternateTags,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            amazon_tag: String::new(),
            amazon_tld: "com".to_string(),
            raw_links: false,
            check_for_redirects: false,
            check_for_redirect_chains: false,
            max_redirect_chain_depth: DEFAULT_MAX_REDIRECT_DEPTH,
            shorten_links: false,
            bitly_token: None,
            alternate_tags: AlternateTags::default(),
            timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

impl std::fmt::Debug for LinkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkConfig")
            .field("amazon_tag", &self.amazon_tag)
            .field("amazon_tld", &self.amazon_tld)
            .field("raw_links", &self.raw_links)
            .field("check_for_redirects", &self.check_for_redirects)
            .field("check_for_redirect_chains", &self.check_for_redirect_chains)
            .field("max_redirect_chain_depth", &self.max_redirect_chain_depth)
            .field("shorten_links", &self.shorten_links)
            .field("bitly_token", &self.bitly_token.as_ref().map(|_| "[redacted]"))
            .field("alternate_tags", &self.alternate_tags)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Pool of alternate affiliate tags and how often one replaces the primary tag
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlternateTags {
    /// Enable alternate-tag selection
    pub enabled: bool,
    /// Candidate tags
    pub pool: Vec<String>,
    /// Probability in `[0, 1]` of using an alternate tag
    pub probability: f64,
}

impl Default for AlternateTags {
    fn default() -> Self {
        Self {
            enabled: false,
            pool: Vec::new(),
            probability: DEFAULT_ALTERNATE_PROBABILITY,
        }
    }
}
