//! Final message assembly
//!
//! Group chats get the original body with every link swapped for its
//! affiliate version, wrapped in the configured template. Private chats get
//! just the links.

use std::fmt;

use super::ResolvedLink;
use super::config::DEFAULT_GROUP_TEMPLATE;
use crate::channels::ChatKind;

/// Named substitution points of a template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Mention of the message author
    User,
    /// Body with links replaced
    Message,
    /// Body as originally sent
    OriginalMessage,
}

impl Slot {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "USER" => Some(Self::User),
            "MESSAGE" => Some(Self::Message),
            "ORIGINAL_MESSAGE" => Some(Self::OriginalMessage),
            _ => None,
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Message => "MESSAGE",
            Self::OriginalMessage => "ORIGINAL_MESSAGE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Slot(Slot),
}

/// Values substituted into a template
#[derive(Debug, Clone, Copy)]
pub struct SlotValues<'a> {
    /// `{USER}`
    pub user: &'a str,
    /// `{MESSAGE}`
    pub message: &'a str,
    /// `{ORIGINAL_MESSAGE}`
    pub original_message: &'a str,
}

impl SlotValues<'_> {
    const fn get(&self, slot: Slot) -> &str {
        match slot {
            Slot::User => self.user,
            Slot::Message => self.message,
            Slot::OriginalMessage => self.original_message,
        }
    }
}

/// A pre-parsed group message template
///
/// Literal `\n` sequences become newlines. `{USER}`, `{MESSAGE}` and
/// `{ORIGINAL_MESSAGE}` are slots; any other `{...}` text is kept verbatim.
/// Substituted values are never scanned for placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTemplate {
    segments: Vec<Segment>,
}

impl MessageTemplate {
    /// Parse a template string
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let source = raw.replace("\\n", "\n");
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = source.as_str();

        while let Some(open) = rest.find('{') {
            literal.push_str(&rest[..open]);
            let after = &rest[open + 1..];

            let slot = after
                .find('}')
                .and_then(|close| Slot::from_name(&after[..close]).map(|s| (s, close)));

            if let Some((slot, close)) = slot {
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Slot(slot));
                rest = &after[close + 1..];
            } else {
                literal.push('{');
                rest = after;
            }
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Self { segments }
    }

    /// Whether the template uses `slot`
    #[must_use]
    pub fn has_slot(&self, slot: Slot) -> bool {
        self.segments.contains(&Segment::Slot(slot))
    }

    /// Render with the given values
    #[must_use]
    pub fn render(&self, values: &SlotValues<'_>) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Slot(slot) => out.push_str(values.get(*slot)),
            }
        }
        out
    }
}

impl Default for MessageTemplate {
    fn default() -> Self {
        Self::parse(DEFAULT_GROUP_TEMPLATE)
    }
}

impl fmt::Display for MessageTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => f.write_str(text)?,
                Segment::Slot(slot) => write!(f, "{{{}}}", slot.name())?,
            }
        }
        Ok(())
    }
}

/// Replace every occurrence of each matched link with its affiliate URL
#[must_use]
pub fn substitute_links(body: &str, links: &[ResolvedLink]) -> String {
    let pairs: Vec<(&str, &str)> = links
        .iter()
        .map(|link| (link.candidate.matched_text.as_str(), link.url.as_str()))
        .collect();
    replace_matches(body, &pairs)
}

/// Replace `(from, to)` pairs in a single left-to-right scan
///
/// At each position the longest matching `from` wins, ties going to the
/// earlier pair. Replacement text is never scanned again.
pub(crate) fn replace_matches(text: &str, pairs: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(ch) = rest.chars().next() {
        let mut best: Option<(&str, &str)> = None;
        for &(from, to) in pairs {
            if !from.is_empty()
                && rest.starts_with(from)
                && best.is_none_or(|(current, _)| from.len() > current.len())
            {
                best = Some((from, to));
            }
        }

        if let Some((from, to)) = best {
            out.push_str(to);
            rest = &rest[from.len()..];
        } else {
            out.push(ch);
            rest = &rest[ch.len_utf8()..];
        }
    }

    out
}

/// Text for a group chat
///
/// `body` is the text links were detected in; `original` is the message as
/// the author sent it (they differ once redirects have been expanded).
#[must_use]
pub fn compose_group(
    template: &MessageTemplate,
    mention: &str,
    body: &str,
    original: &str,
    links: &[ResolvedLink],
) -> String {
    let message = substitute_links(body, links);
    template.render(&SlotValues {
        user: mention,
        message: &message,
        original_message: original,
    })
}

/// Text for a private chat
#[must_use]
pub fn compose_private(links: &[ResolvedLink]) -> String {
    match links {
        [single] => single.url.clone(),
        _ => links
            .iter()
            .map(|link| format!("• {}", link.url))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// Text for the given chat kind
#[must_use]
pub fn compose(
    kind: ChatKind,
    template: &MessageTemplate,
    mention: &str,
    body: &str,
    original: &str,
    links: &[ResolvedLink],
) -> String {
    match kind {
        ChatKind::Group => compose_group(template, mention, body, original, links),
        ChatKind::Private => compose_private(links),
    }
}
