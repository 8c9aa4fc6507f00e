//! Inline reference autocomplete ("type `[[` to link another note").
//!
//! Trigger detection finds an unterminated open marker on the cursor's
//! line; dispatch is debounced so fast typing costs one fuzzy lookup,
//! not one per keystroke. The resolver is stateless per call except for
//! the debounce generation counter; keyboard cycling and dismissal are
//! the consumer's concern.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::debug;

use cairn_core::{excerpt, slugify, NoteSnapshot, ReferenceSuggestion, Result};

use crate::fuzzy::FuzzyIndex;

/// Open/close reference markers.
pub const OPEN_MARKER: &str = "[[";
pub const CLOSE_MARKER: &str = "]]";

/// Quiet period before an in-progress query is dispatched.
pub const DEBOUNCE: Duration = Duration::from_millis(300);

/// Minimum in-progress query length before dispatch.
pub const MIN_QUERY_LEN: usize = 2;

/// Result cap for suggestions.
pub const MAX_SUGGESTIONS: usize = 8;

/// An in-progress reference detected at the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceTrigger {
    /// Text between the open marker and the cursor.
    pub query: String,
    /// Byte offset of the open marker in the full text.
    pub marker_offset: usize,
}

/// Scan backward from `cursor` for an unterminated open marker on the
/// same line. Returns `None` when there is no marker, the span crosses a
/// newline, the span is already closed, or the reference is complete (a
/// close marker after the cursor on the same line).
pub fn detect_reference(text: &str, cursor: usize) -> Option<ReferenceTrigger> {
    let before = text.get(..cursor)?;
    let open = before.rfind(OPEN_MARKER)?;
    let span = &before[open + OPEN_MARKER.len()..];
    if span.contains('\n') || span.contains(CLOSE_MARKER) {
        return None;
    }

    // Already-complete reference: a close marker after the cursor on the
    // same line, before any new open marker.
    let after = &text[cursor..];
    let line = &after[..after.find('\n').unwrap_or(after.len())];
    if let Some(close) = line.find(CLOSE_MARKER) {
        let reopened = line[..close].contains(OPEN_MARKER);
        if !reopened {
            return None;
        }
    }

    Some(ReferenceTrigger {
        query: span.to_string(),
        marker_offset: open,
    })
}

/// Debounced reference resolver.
///
/// Each call bumps the generation counter; when the quiet period ends,
/// only the newest call dispatches to the fuzzy index. Superseded calls
/// return empty without dispatching.
pub struct BracketResolver {
    debounce: Duration,
    generation: AtomicU64,
    dispatches: AtomicU64,
}

impl Default for BracketResolver {
    fn default() -> Self {
        Self::new(DEBOUNCE)
    }
}

impl BracketResolver {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            generation: AtomicU64::new(0),
            dispatches: AtomicU64::new(0),
        }
    }

    /// Number of queries actually dispatched to the fuzzy index. One
    /// burst of typing should count one dispatch.
    pub fn dispatches(&self) -> u64 {
        self.dispatches.load(Ordering::SeqCst)
    }

    /// Resolve suggestions for the reference at `cursor` against a
    /// pre-fetched snapshot. See [`Self::resolve_with`].
    pub async fn resolve(
        &self,
        notes: &[NoteSnapshot],
        text: &str,
        cursor: usize,
    ) -> Vec<ReferenceSuggestion> {
        self.resolve_with(text, cursor, async { Ok(notes.to_vec()) })
            .await
            .unwrap_or_default()
    }

    /// Resolve suggestions for the reference at `cursor`, debounced.
    ///
    /// `fetch` is awaited only after the quiet period ends and only by
    /// the newest call, so superseded keystrokes never pay for a
    /// snapshot fetch. Returns empty when no trigger is active, the
    /// query is shorter than [`MIN_QUERY_LEN`], or a newer keystroke
    /// superseded this call during the quiet period.
    pub async fn resolve_with<F>(
        &self,
        text: &str,
        cursor: usize,
        fetch: F,
    ) -> Result<Vec<ReferenceSuggestion>>
    where
        F: Future<Output = Result<Vec<NoteSnapshot>>>,
    {
        let Some(trigger) = detect_reference(text, cursor) else {
            return Ok(Vec::new());
        };
        if trigger.query.chars().count() < MIN_QUERY_LEN {
            return Ok(Vec::new());
        }

        let token = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.debounce).await;
        if self.generation.load(Ordering::SeqCst) != token {
            // A newer keystroke restarted the timer; this call is stale.
            return Ok(Vec::new());
        }

        self.dispatches.fetch_add(1, Ordering::SeqCst);
        let notes = fetch.await?;
        let index = match FuzzyIndex::build(&notes) {
            Ok(index) => index,
            Err(error) => {
                debug!(
                    subsystem = "bracket",
                    component = "resolver",
                    error = %error,
                    "Index build failed; no suggestions"
                );
                return Ok(Vec::new());
            }
        };

        let mut candidates = index.search(&trigger.query);
        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.note_id.cmp(&b.note_id))
        });
        candidates.truncate(MAX_SUGGESTIONS);

        debug!(
            subsystem = "bracket",
            component = "resolver",
            query = %trigger.query,
            result_count = candidates.len(),
            "Reference suggestions dispatched"
        );

        Ok(candidates
            .into_iter()
            .filter_map(|candidate| {
                let note = notes.iter().find(|n| n.id == candidate.note_id)?;
                Some(ReferenceSuggestion {
                    note_id: note.id,
                    title: note.title.clone(),
                    slug: slugify(&note.title),
                    excerpt: note.body.as_deref().map(|b| excerpt(b, 80)),
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_core::NoteCategory;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;
    use uuid::Uuid;

    fn note(title: &str) -> NoteSnapshot {
        NoteSnapshot {
            id: Uuid::new_v4(),
            title: title.to_string(),
            body: Some("Some body text for the note.".to_string()),
            tags: Vec::new(),
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap(),
            pinned: false,
            category: NoteCategory::None,
            semantic_enabled: false,
        }
    }

    // ── Trigger detection ──────────────────────────────────────────────

    #[test]
    fn test_detects_open_reference() {
        let text = "see [[alp";
        let trigger = detect_reference(text, text.len()).unwrap();
        assert_eq!(trigger.query, "alp");
        assert_eq!(trigger.marker_offset, 4);
    }

    #[test]
    fn test_no_marker_no_trigger() {
        assert!(detect_reference("plain text", 5).is_none());
    }

    #[test]
    fn test_newline_breaks_span() {
        let text = "see [[al\npha";
        assert!(detect_reference(text, text.len()).is_none());
    }

    #[test]
    fn test_complete_reference_not_eligible() {
        let text = "see [[alpha]] more";
        // Cursor inside the completed span.
        assert!(detect_reference(text, 8).is_none());
    }

    #[test]
    fn test_new_marker_after_complete_reference() {
        let text = "see [[alpha]] and [[be";
        let trigger = detect_reference(text, text.len()).unwrap();
        assert_eq!(trigger.query, "be");
    }

    #[test]
    fn test_backward_scan_finds_innermost_marker() {
        let text = "[[a [[b";
        let trigger = detect_reference(text, text.len()).unwrap();
        // Scanning backward finds the innermost marker.
        assert_eq!(trigger.query, "b");
    }

    #[test]
    fn test_cursor_not_on_char_boundary_is_none() {
        let text = "[[héllo";
        // Offset 4 splits the two-byte 'é'.
        assert!(detect_reference(text, 4).is_none());
    }

    // ── Debounce ───────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn test_debounce_coalesces_rapid_keystrokes() {
        let resolver = Arc::new(BracketResolver::default());
        let notes = Arc::new(vec![note("Alpha Kickoff"), note("Beta Review")]);

        let mut handles = Vec::new();
        for text in ["[[a", "[[ab", "[[abc"] {
            let resolver = Arc::clone(&resolver);
            let notes = Arc::clone(&notes);
            handles.push(tokio::spawn(async move {
                resolver.resolve(&notes, text, text.len()).await
            }));
            tokio::time::advance(Duration::from_millis(50)).await;
        }
        tokio::time::advance(Duration::from_millis(400)).await;

        let mut outputs = Vec::new();
        for handle in handles {
            outputs.push(handle.await.unwrap());
        }

        // "a" is below the length floor, "ab" was superseded; only "abc"
        // dispatched.
        assert_eq!(resolver.dispatches(), 1);
        assert!(outputs[0].is_empty());
        assert!(outputs[1].is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_final_query_is_not_dropped() {
        let resolver = Arc::new(BracketResolver::default());
        let notes = Arc::new(vec![note("Alpha Kickoff")]);

        let r = Arc::clone(&resolver);
        let n = Arc::clone(&notes);
        let handle = tokio::spawn(async move { r.resolve(&n, "[[alpha", 7).await });
        tokio::time::advance(Duration::from_millis(301)).await;

        let suggestions = handle.await.unwrap();
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].title, "Alpha Kickoff");
        assert_eq!(suggestions[0].slug, "alpha-kickoff");
        assert!(suggestions[0].excerpt.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_suggestion_cap() {
        let resolver = BracketResolver::default();
        let notes: Vec<NoteSnapshot> = (0..12).map(|i| note(&format!("alpha {i}"))).collect();

        let fut = resolver.resolve(&notes, "[[alpha", 7);
        let suggestions = fut.await;
        assert_eq!(suggestions.len(), MAX_SUGGESTIONS);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_query_not_dispatched() {
        let resolver = BracketResolver::default();
        let notes = vec![note("Alpha")];
        let suggestions = resolver.resolve(&notes, "[[a", 3).await;
        assert!(suggestions.is_empty());
        assert_eq!(resolver.dispatches(), 0);
    }
}
