//! Backlink context extraction.
//!
//! For an incoming edge with anchor text, we show the reader where the
//! link came from: up to three sentences of the source note's body around
//! the first occurrence of the anchor (one before, the matching sentence,
//! one after).

use once_cell::sync::Lazy;
use regex::Regex;

/// Sentence boundaries are `[.!?]+` runs; empty segments are dropped.
static SENTENCE_BOUNDARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]+").unwrap());

/// Split `body` into trimmed, non-empty sentences.
pub fn split_sentences(body: &str) -> Vec<&str> {
    SENTENCE_BOUNDARY
        .split(body)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Extract up to three sentences around the first case-insensitive
/// occurrence of `anchor` in `body`.
///
/// Returns `None` when the anchor does not appear; a missing anchor is
/// not an error, the backlink just carries no context.
pub fn anchor_context(body: &str, anchor: &str) -> Option<String> {
    let anchor = anchor.trim();
    if anchor.is_empty() {
        return None;
    }

    let sentences = split_sentences(body);
    let anchor_lower = anchor.to_lowercase();
    let hit = sentences
        .iter()
        .position(|s| s.to_lowercase().contains(&anchor_lower))?;

    let start = hit.saturating_sub(1);
    let end = (hit + 2).min(sentences.len());
    Some(sentences[start..end].join(". "))
}
