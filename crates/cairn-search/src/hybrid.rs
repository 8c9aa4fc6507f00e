//! Merging fuzzy and semantic candidate sets into ranked results.
//!
//! The merge is a keyed map pass (O(n), not nested loops): a note present
//! in both sets gets a blended score and the `Hybrid` type; a note in one
//! set passes through unchanged. Recency boosting, tier assignment, and
//! the final sort happen here so every entry point ranks identically.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tracing::debug;
use uuid::Uuid;

use cairn_core::{NoteSnapshot, ResultTier, SearchResult, SearchType, VectorMatch};

use crate::fuzzy::FuzzyCandidate;

/// Minimum raw similarity for semantic results to enter the merge.
///
/// The vector backend returns top-K regardless of actual similarity;
/// without a floor, nonsense queries surface unrelated notes. Typical
/// good matches score 0.5-0.9, truly unrelated content below 0.2.
pub const MIN_SEMANTIC_SIMILARITY: f32 = 0.3;

/// Result cap requested from the vector backend.
pub const SEMANTIC_CANDIDATE_CAP: usize = 20;

/// Configuration for the hybrid merge.
#[derive(Debug, Clone)]
pub struct HybridConfig {
    /// Weight for semantic scores when a note is in both sets.
    pub semantic_weight: f32,
    /// Weight for fuzzy scores when a note is in both sets.
    pub fuzzy_weight: f32,
    /// Similarity floor passed to the vector backend.
    pub min_semantic_similarity: f32,
    /// Result cap passed to the vector backend.
    pub semantic_limit: usize,
    /// Upper bound on the embedding and vector calls; exceeding it is a
    /// degradable failure (fuzzy-only fallback).
    pub semantic_timeout: Duration,
    /// Multiplier applied once to recently updated notes.
    pub recency_boost: f32,
    /// How recent "recently updated" is, in days.
    pub recency_window_days: i64,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            semantic_weight: 0.6,
            fuzzy_weight: 0.4,
            min_semantic_similarity: MIN_SEMANTIC_SIMILARITY,
            semantic_limit: SEMANTIC_CANDIDATE_CAP,
            semantic_timeout: Duration::from_secs(3),
            recency_boost: 1.1,
            recency_window_days: 30,
        }
    }
}

impl HybridConfig {
    /// Create a config with custom merge weights.
    pub fn with_weights(semantic_weight: f32, fuzzy_weight: f32) -> Self {
        Self {
            semantic_weight,
            fuzzy_weight,
            ..Default::default()
        }
    }

    /// Set the semantic call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.semantic_timeout = timeout;
        self
    }

    /// Set the similarity floor for the vector backend.
    pub fn with_min_similarity(mut self, floor: f32) -> Self {
        self.min_semantic_similarity = floor;
        self
    }
}

/// Merge fuzzy and semantic candidates against the current snapshot.
///
/// Semantic matches whose id is not in `notes` are stale vectors and are
/// dropped. The recency boost is applied exactly once, after the merge.
/// The final order is score descending with ties broken by `updated_at`
/// descending; the ordering is deterministic for identical inputs.
pub fn merge_candidates(
    fuzzy: &[FuzzyCandidate],
    semantic: &[VectorMatch],
    notes: &HashMap<Uuid, &NoteSnapshot>,
    config: &HybridConfig,
    now: DateTime<Utc>,
) -> Vec<SearchResult> {
    struct Merged<'a> {
        note: &'a NoteSnapshot,
        fuzzy_score: Option<f32>,
        matched_tags: Vec<String>,
        semantic_similarity: Option<f32>,
    }

    let mut merged: HashMap<Uuid, Merged<'_>> = HashMap::with_capacity(fuzzy.len());
    for candidate in fuzzy {
        let Some(note) = notes.get(&candidate.note_id).copied() else {
            continue;
        };
        merged.insert(
            candidate.note_id,
            Merged {
                note,
                fuzzy_score: Some(candidate.score),
                matched_tags: candidate.matched_tags.clone(),
                semantic_similarity: None,
            },
        );
    }

    let mut stale = 0usize;
    for m in semantic {
        let Some(note) = notes.get(&m.note_id).copied() else {
            stale += 1;
            continue;
        };
        merged
            .entry(m.note_id)
            .and_modify(|entry| entry.semantic_similarity = Some(m.similarity))
            .or_insert(Merged {
                note,
                fuzzy_score: None,
                matched_tags: Vec::new(),
                semantic_similarity: Some(m.similarity),
            });
    }
    if stale > 0 {
        debug!(
            subsystem = "search",
            component = "semantic_merge",
            stale,
            "Dropped stale vector ids absent from snapshot"
        );
    }

    let recency_cutoff = now - ChronoDuration::days(config.recency_window_days);
    let mut results: Vec<SearchResult> = merged
        .into_values()
        .map(|entry| {
            let (score, search_type) = match (entry.fuzzy_score, entry.semantic_similarity) {
                (Some(f), Some(s)) => (
                    config.semantic_weight * s + config.fuzzy_weight * f,
                    SearchType::Hybrid,
                ),
                (Some(f), None) => (f, SearchType::Fuzzy),
                (None, Some(s)) => (s, SearchType::Semantic),
                (None, None) => unreachable!("merged entry with no source"),
            };
            let score = if entry.note.updated_at >= recency_cutoff {
                score * config.recency_boost
            } else {
                score
            };
            let mut result =
                SearchResult::from_note(entry.note, score, search_type, entry.matched_tags);
            result.tier = ResultTier::from_score(score);
            result.semantic_similarity = entry.semantic_similarity;
            result
        })
        .collect();

    sort_results(&mut results);
    results
}

/// Score descending, ties by `updated_at` descending, then note id for
/// full determinism.
pub fn sort_results(results: &mut [SearchResult]) {
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.updated_at.cmp(&a.updated_at))
            .then_with(|| a.note_id.cmp(&b.note_id))
    });
}
