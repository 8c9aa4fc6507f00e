//! In-memory multi-field weighted fuzzy index.
//!
//! The index is rebuilt whenever the note snapshot changes and produces
//! lexical-match candidates without any network call. The underlying
//! metric is a distance in `[0, 1]` (0 = perfect match) built from exact
//! and substring shortcuts plus character-trigram overlap; the score
//! exposed to the merger is `1 - distance`, so higher is better across
//! the whole pipeline.

use std::collections::HashSet;

use tracing::trace;
use uuid::Uuid;

use cairn_core::{Error, NoteSnapshot, Result};

/// Field weights for the multi-field match.
pub const TITLE_WEIGHT: f32 = 0.4;
pub const BODY_WEIGHT: f32 = 0.3;
pub const TAG_WEIGHT: f32 = 0.3;

/// Weighted scores below this are noise, not candidates.
const MIN_CANDIDATE_SCORE: f32 = 0.05;

/// Character n-gram size for the overlap metric.
const NGRAM_SIZE: usize = 3;

/// A scored lexical-match candidate.
#[derive(Debug, Clone)]
pub struct FuzzyCandidate {
    pub note_id: Uuid,
    /// `1 - distance`; always in `[0, 1]`.
    pub score: f32,
    /// Populated only in tag mode, from the intersecting tags.
    pub matched_tags: Vec<String>,
}

#[derive(Debug)]
struct IndexEntry {
    note_id: Uuid,
    title: String,
    body: String,
    /// Original tag strings, for `matched_tags`.
    tags: Vec<String>,
    tags_lower: Vec<String>,
    title_grams: HashSet<String>,
    body_grams: HashSet<String>,
    tag_grams: HashSet<String>,
}

/// Fuzzy index over one note snapshot.
#[derive(Debug)]
pub struct FuzzyIndex {
    entries: Vec<IndexEntry>,
}

impl FuzzyIndex {
    /// Build the index from a snapshot. Fails on a corrupt snapshot
    /// (duplicate note ids); this is the fatal error class, since no
    /// fallback exists below the fuzzy layer.
    pub fn build(notes: &[NoteSnapshot]) -> Result<Self> {
        let mut seen = HashSet::with_capacity(notes.len());
        let mut entries = Vec::with_capacity(notes.len());
        for note in notes {
            if !seen.insert(note.id) {
                return Err(Error::Index(format!("duplicate note id {}", note.id)));
            }
            let title = note.title.to_lowercase();
            let body = note
                .body
                .as_deref()
                .map(str::to_lowercase)
                .unwrap_or_default();
            let tags_lower: Vec<String> = note.tags.iter().map(|t| t.to_lowercase()).collect();
            let tag_text = tags_lower.join(" ");
            entries.push(IndexEntry {
                note_id: note.id,
                title_grams: ngram_set(&title),
                body_grams: ngram_set(&body),
                tag_grams: ngram_set(&tag_text),
                title,
                body,
                tags: note.tags.clone(),
                tags_lower,
            });
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Weighted multi-field match. An empty query returns the entire
    /// snapshot with score 1.0 ("browse all"), not an empty result.
    pub fn search(&self, query: &str) -> Vec<FuzzyCandidate> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return self.all();
        }
        let query_grams = ngram_set(&query);

        let mut candidates = Vec::new();
        for entry in &self.entries {
            let title_score = 1.0 - field_distance(&query, &query_grams, &entry.title, &entry.title_grams);
            let body_score = 1.0 - field_distance(&query, &query_grams, &entry.body, &entry.body_grams);
            let tag_text = entry.tags_lower.join(" ");
            let tag_score = 1.0 - field_distance(&query, &query_grams, &tag_text, &entry.tag_grams);

            let score =
                TITLE_WEIGHT * title_score + BODY_WEIGHT * body_score + TAG_WEIGHT * tag_score;
            if score >= MIN_CANDIDATE_SCORE {
                trace!(
                    note_id = %entry.note_id,
                    score,
                    title_score,
                    body_score,
                    tag_score,
                    "fuzzy candidate"
                );
                candidates.push(FuzzyCandidate {
                    note_id: entry.note_id,
                    score,
                    matched_tags: Vec::new(),
                });
            }
        }
        candidates
    }

    /// The entire snapshot with score 1.0.
    pub fn all(&self) -> Vec<FuzzyCandidate> {
        self.entries
            .iter()
            .map(|entry| FuzzyCandidate {
                note_id: entry.note_id,
                score: 1.0,
                matched_tags: Vec::new(),
            })
            .collect()
    }

    /// Tag mode: strict membership match. A note qualifies when every
    /// query is a substring of at least one of its tags; all matching
    /// notes score 1.0 and `matched_tags` holds the intersecting tags.
    pub fn search_tags(&self, tag_queries: &[String]) -> Vec<FuzzyCandidate> {
        let queries: Vec<String> = tag_queries
            .iter()
            .map(|q| q.trim().to_lowercase())
            .filter(|q| !q.is_empty())
            .collect();
        if queries.is_empty() {
            return Vec::new();
        }

        let mut candidates = Vec::new();
        for entry in &self.entries {
            let all_match = queries.iter().all(|q| {
                entry.tags_lower.iter().any(|tag| tag.contains(q.as_str()))
            });
            if !all_match {
                continue;
            }
            let matched_tags: Vec<String> = entry
                .tags
                .iter()
                .zip(&entry.tags_lower)
                .filter(|(_, lower)| queries.iter().any(|q| lower.contains(q.as_str())))
                .map(|(original, _)| original.clone())
                .collect();
            candidates.push(FuzzyCandidate {
                note_id: entry.note_id,
                score: 1.0,
                matched_tags,
            });
        }
        candidates
    }
}

/// Distance in `[0, 1]` between a query and a field: 0 for an exact
/// match, 0.1 for a substring hit, otherwise one minus the trigram
/// overlap coefficient.
fn field_distance(
    query: &str,
    query_grams: &HashSet<String>,
    text: &str,
    text_grams: &HashSet<String>,
) -> f32 {
    if text.is_empty() {
        return 1.0;
    }
    if text == query {
        return 0.0;
    }
    if text.contains(query) {
        return 0.1;
    }
    if query_grams.is_empty() || text_grams.is_empty() {
        return 1.0;
    }
    let intersection = query_grams.intersection(text_grams).count() as f32;
    let denominator = query_grams.len().max(text_grams.len()) as f32;
    1.0 - intersection / denominator
}

/// Character n-grams over the alphanumeric tokens of `text`. Tokens
/// shorter than the n-gram size contribute themselves.
fn ngram_set(text: &str) -> HashSet<String> {
    let mut grams = HashSet::new();
    for token in text.split(|c: char| !c.is_alphanumeric()) {
        if token.is_empty() {
            continue;
        }
        let chars: Vec<char> = token.chars().collect();
        if chars.len() <= NGRAM_SIZE {
            grams.insert(token.to_string());
        } else {
            for window in chars.windows(NGRAM_SIZE) {
                grams.insert(window.iter().collect());
            }
        }
    }
    grams
}
