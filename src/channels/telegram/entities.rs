//! Flattening of Telegram `text_link` entities
//!
//! A `text_link` shows arbitrary text but points at a hidden URL. The URL is
//! spliced into the text in place of the shown span so link detection can see
//! it. Offsets and lengths are in UTF-16 code units.

/// A hidden link over a span of text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLink {
    /// Start of the span, in UTF-16 code units
    pub offset: usize,
    /// Length of the span, in UTF-16 code units
    pub length: usize,
    /// Link target
    pub url: String,
}

/// Replace each linked span with its URL
///
/// Spans that overlap an earlier one or fall outside the text (or inside a
/// surrogate pair) are skipped.
#[must_use]
pub fn flatten_text_links(text: &str, links: &[TextLink]) -> String {
    if links.is_empty() {
        return text.to_string();
    }

    // (utf16 offset, byte offset) for every char boundary, including the end
    let mut boundaries = Vec::with_capacity(text.len() + 1);
    let mut utf16 = 0;
    for (byte, ch) in text.char_indices() {
        boundaries.push((utf16, byte));
        utf16 += ch.len_utf16();
    }
    boundaries.push((utf16, text.len()));

    let byte_at = |offset: usize| {
        boundaries
            .binary_search_by_key(&offset, |&(u, _)| u)
            .ok()
            .map(|i| boundaries[i].1)
    };

    let mut sorted: Vec<&TextLink> = links.iter().collect();
    sorted.sort_by_key(|link| link.offset);

    let mut out = String::with_capacity(text.len());
    let mut cursor_utf16 = 0;
    let mut cursor_byte = 0;

    for link in sorted {
        if link.offset < cursor_utf16 {
            tracing::debug!(offset = link.offset, "skipping overlapping text link");
            continue;
        }
        let end = link.offset + link.length;
        let (Some(start_byte), Some(end_byte)) = (byte_at(link.offset), byte_at(end)) else {
            tracing::debug!(
                offset = link.offset,
                length = link.length,
                "skipping out-of-range text link"
            );
            continue;
        };

        out.push_str(&text[cursor_byte..start_byte]);
        out.push_str(&link.url);
        cursor_utf16 = end;
        cursor_byte = end_byte;
    }

    out.push_str(&text[cursor_byte..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(offset: usize, length: usize, url: &str) -> TextLink {
        TextLink {
            offset,
            length,
            url: url.to_string(),
        }
    }

    #[test]
    fn test_no_links() {
        assert_eq!(flatten_text_links("plain", &[]), "plain");
    }

    #[test]
    fn test_single_link() {
        let text = "Buy this now";
        let out = flatten_text_links(text, &[link(4, 4, "https://amzn.to/x")]);
        assert_eq!(out, "Buy https://amzn.to/x now");
    }

    #[test]
    fn test_multiple_links_any_order() {
        let text = "one two three";
        let out = flatten_text_links(
            text,
            &[link(8, 5, "https://c.test"), link(0, 3, "https://a.test")],
        );
        assert_eq!(out, "https://a.test two https://c.test");
    }

    #[test]
    fn test_utf16_offsets_after_emoji() {
        // The emoji takes two UTF-16 units and four bytes
        let text = "🔥 deal here";
        let out = flatten_text_links(text, &[link(3, 4, "https://amzn.eu/d/abc")]);
        assert_eq!(out, "🔥 https://amzn.eu/d/abc here");
    }

    #[test]
    fn test_accented_text() {
        let text = "Offerta è qui";
        let out = flatten_text_links(text, &[link(10, 3, "https://amzn.to/q")]);
        assert_eq!(out, "Offerta è https://amzn.to/q");
    }

    #[test]
    fn test_out_of_range_skipped() {
        let out = flatten_text_links("short", &[link(3, 10, "https://x.test")]);
        assert_eq!(out, "short");
    }

    #[test]
    fn test_overlap_skipped() {
        let out = flatten_text_links(
            "abcdef",
            &[link(0, 4, "https://a.test"), link(2, 2, "https://b.test")],
        );
        assert_eq!(out, "https://a.testef");
    }

    #[test]
    fn test_split_surrogate_skipped() {
        let out = flatten_text_links("🔥x", &[link(1, 1, "https://x.test")]);
        assert_eq!(out, "🔥x");
    }
}
