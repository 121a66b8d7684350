//! Per-message citation disclosure.

use std::collections::HashMap;

use crate::models::{Message, MessageId, Source};

/// Number of sources shown verbatim when a message is expanded.
pub const PREVIEW_LIMIT: usize = 3;

/// One line of an expanded source preview.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PreviewEntry<'a> {
    /// A source shown in full.
    Source(&'a Source),
    /// Summary standing in for the sources past the limit.
    More(usize),
}

impl std::fmt::Display for PreviewEntry<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Source(source) => write!(f, "• {}", source.excerpt),
            Self::More(count) => write!(f, "+ {count} more"),
        }
    }
}

/// Expanded/collapsed flags keyed by message id. Absent means collapsed.
///
/// Entries for messages that no longer exist are left in place; lookups by
/// a stale id never match a live message.
#[derive(Debug, Clone, Default)]
pub struct DisclosureMap {
    expanded: HashMap<MessageId, bool>,
}

impl DisclosureMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the flag for `id` and return the new state.
    pub fn toggle(&mut self, id: MessageId) -> bool {
        let flag = self.expanded.entry(id).or_insert(false);
        *flag = !*flag;
        *flag
    }

    /// Whether the sources of `id` are expanded.
    pub fn is_expanded(&self, id: MessageId) -> bool {
        self.expanded.get(&id).copied().unwrap_or(false)
    }

    /// Entries to display for `message`: nothing when collapsed, otherwise
    /// the first [`PREVIEW_LIMIT`] sources plus a count of the rest.
    pub fn preview<'a>(&self, message: &'a Message) -> Vec<PreviewEntry<'a>> {
        if !self.is_expanded(message.id) {
            return Vec::new();
        }

        let mut entries: Vec<_> = message
            .sources
            .iter()
            .take(PREVIEW_LIMIT)
            .map(PreviewEntry::Source)
            .collect();
        let remaining = message.sources.len().saturating_sub(PREVIEW_LIMIT);
        if remaining > 0 {
            entries.push(PreviewEntry::More(remaining));
        }
        entries
    }
}
