//! Affiliate URL construction and tag selection

use rand::Rng;
use rand::seq::SliceRandom;
use url::Url;

use super::config::AlternateTags;
use crate::Result;

/// Query parameter carrying the affiliate tag
const TAG_PARAM: &str = "tag";

/// Canonical product URL for an ASIN on the given marketplace
#[must_use]
pub fn build_product_url(tld: &str, asin: &str, tag: &str) -> String {
    format!("https://www.amazon.{tld}/dp/{asin}?{TAG_PARAM}={tag}")
}

/// Re-tag an arbitrary URL, keeping its path, fragment and other parameters
///
/// An existing `tag` keeps its position and is overwritten; any further
/// `tag` parameters are dropped. Without one, `tag` is appended.
///
/// # Errors
///
/// Returns error if `url` cannot be parsed
pub fn retag_url(url: &str, tag: &str) -> Result<String> {
    let mut parsed = Url::parse(url)?;

    let mut replaced = false;
    let pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .filter_map(|(key, value)| {
            if key != TAG_PARAM {
                return Some((key.into_owned(), value.into_owned()));
            }
            if replaced {
                return None;
            }
            replaced = true;
            Some((key.into_owned(), tag.to_string()))
        })
        .collect();

    {
        let mut query = parsed.query_pairs_mut();
        query.clear();
        query.extend_pairs(&pairs);
        if !replaced {
            query.append_pair(TAG_PARAM, tag);
        }
    }

    Ok(parsed.into())
}

/// Pick the tag for one link
///
/// With probability `probability` a tag is drawn uniformly from `pool`
/// (excluding `primary`); otherwise, or when nothing is left to draw from,
/// `primary` is returned.
pub fn select_tag<'a, R: Rng + ?Sized>(
    primary: &'a str,
    pool: &'a [String],
    probability: f64,
    rng: &mut R,
) -> &'a str {
    let alternates: Vec<&String> = pool.iter().filter(|t| t.as_str() != primary).collect();
    if alternates.is_empty() || !rng.gen_bool(probability.clamp(0.0, 1.0)) {
        return primary;
    }

    alternates.choose(rng).copied().map_or(primary, String::as_str)
}

/// Chooses tags according to the alternate-tag settings
#[derive(Debug, Clone)]
pub struct TagSelector {
    primary: String,
    alternates: AlternateTags,
}

impl TagSelector {
    /// Create a selector
    #[must_use]
    pub fn new(primary: String, alternates: AlternateTags) -> Self {
        Self {
            primary,
            alternates,
        }
    }

    /// The primary tag
    #[must_use]
    pub fn primary(&self) -> &str {
        &self.primary
    }

    /// Pick a tag using the given random source
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        if !self.alternates.enabled {
            return &self.primary;
        }
        select_tag(
            &self.primary,
            &self.alternates.pool,
            self.alternates.probability,
            rng,
        )
    }
}
