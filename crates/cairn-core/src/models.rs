//! Core data model for the cairn search engine.
//!
//! All of these types are read snapshots or value objects: the engine never
//! owns note or link persistence. `NoteSnapshot` and `LinkEdge` are rebuilt
//! per query from the external stores; `SearchQuery` is constructed per
//! request and never mutated after dispatch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::temporal::DateRange;
use crate::text::excerpt;

// =============================================================================
// NOTE SNAPSHOT
// =============================================================================

/// Note category, inferred from query keywords or set by the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteCategory {
    Personal,
    Work,
    Research,
    #[default]
    None,
}

/// Immutable per-query view of a note, owned by the external note store.
///
/// Callers must not mutate the snapshot set while a search is outstanding;
/// the engine treats it as frozen input for the duration of one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteSnapshot {
    pub id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub category: NoteCategory,
    /// Whether a vector exists for this note in the similarity backend.
    #[serde(default)]
    pub semantic_enabled: bool,
}

// =============================================================================
// LINK EDGE
// =============================================================================

/// A directed link relation between two notes.
///
/// Multiple edges may share the same (source, target) pair with different
/// anchor texts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkEdge {
    pub source_id: Uuid,
    pub target_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor_text: Option<String>,
    pub canonical_title: String,
}

// =============================================================================
// SEARCH QUERY
// =============================================================================

/// Search mode selected by the interpreter or forced by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Lexical matching only.
    Text,
    /// Strict tag-membership matching.
    Tags,
    /// Fuzzy + semantic (default).
    #[default]
    Combined,
    /// Semantic similarity emphasis.
    Similarity,
    /// Link-graph driven matching (relevance order preserved).
    Connections,
    /// Link-graph driven matching, sorted by total connections.
    MostConnected,
}

/// Filters applied to candidates after lexical/semantic matching.
///
/// Tag filters use AND logic for `include_tags` and NOT logic for
/// `exclude_tags`. Link filters consult the per-query link graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchFilters {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include_tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_tags: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<NoteCategory>,

    /// When true, only pinned notes pass.
    #[serde(default)]
    pub pinned_only: bool,

    /// Only notes with an outgoing edge to this note pass.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected_to: Option<Uuid>,

    /// Only notes with an incoming edge from this note pass.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected_from: Option<Uuid>,

    /// Inclusive lower bound on total connection count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_connections: Option<usize>,

    /// Inclusive upper bound on total connection count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<usize>,

    /// Only notes with zero incoming and zero outgoing edges pass.
    #[serde(default)]
    pub orphaned_only: bool,
}

impl SearchFilters {
    /// Create a new empty filter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a tag (AND logic).
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.include_tags.push(tag.into());
        self
    }

    /// Exclude a tag (NOT logic).
    pub fn exclude_tag(mut self, tag: impl Into<String>) -> Self {
        self.exclude_tags.push(tag.into());
        self
    }

    /// Restrict to notes touched within `[start, end)`.
    pub fn updated_between(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.date_range = Some(DateRange::new(start, end));
        self
    }

    /// Restrict to a category.
    pub fn with_category(mut self, category: NoteCategory) -> Self {
        self.category = Some(category);
        self
    }

    /// Restrict to pinned notes.
    pub fn pinned(mut self) -> Self {
        self.pinned_only = true;
        self
    }

    /// Restrict to notes linking to the given note.
    pub fn connected_to(mut self, id: Uuid) -> Self {
        self.connected_to = Some(id);
        self
    }

    /// Restrict to notes linked from the given note.
    pub fn connected_from(mut self, id: Uuid) -> Self {
        self.connected_from = Some(id);
        self
    }

    /// Restrict total connection count to `[min, max]`.
    pub fn connection_count(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min_connections = min;
        self.max_connections = max;
        self
    }

    /// Restrict to orphaned notes.
    pub fn orphaned(mut self) -> Self {
        self.orphaned_only = true;
        self
    }

    /// Check if the filter set is empty (no constraints).
    pub fn is_empty(&self) -> bool {
        self.include_tags.is_empty()
            && self.exclude_tags.is_empty()
            && self.date_range.is_none()
            && self.category.is_none()
            && !self.pinned_only
            && self.connected_to.is_none()
            && self.connected_from.is_none()
            && self.min_connections.is_none()
            && self.max_connections.is_none()
            && !self.orphaned_only
    }
}

/// A search request. Value object: constructed per request, never mutated
/// after dispatch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchQuery {
    pub text: String,
    #[serde(default)]
    pub filters: SearchFilters,
    #[serde(default)]
    pub mode: SearchMode,
    /// Attempt the semantic pass even when the eligibility heuristic says
    /// it is not worth the embedding call.
    #[serde(default)]
    pub force_semantic: bool,
    /// Maximum number of results (None = unbounded).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl SearchQuery {
    /// Create a query from raw text with default mode and no filters.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Set the search mode.
    pub fn with_mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Replace the filter set.
    pub fn with_filters(mut self, filters: SearchFilters) -> Self {
        self.filters = filters;
        self
    }

    /// Force the semantic pass regardless of the eligibility heuristic.
    pub fn force_semantic(mut self) -> Self {
        self.force_semantic = true;
        self
    }

    /// Cap the number of results.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

// =============================================================================
// SEARCH RESULTS
// =============================================================================

/// Which pass produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    Fuzzy,
    Semantic,
    Hybrid,
}

/// Coarse display bucket derived from score. Presentation metadata only;
/// tiers never affect sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultTier {
    Exact,
    High,
    Medium,
    Related,
}

impl ResultTier {
    /// Bucket a score. Boundaries are inclusive: 0.9 is `Exact`, 0.7 is
    /// `High`, 0.5 is `Medium`, anything below is `Related`.
    pub fn from_score(score: f32) -> Self {
        if score >= 0.9 {
            Self::Exact
        } else if score >= 0.7 {
            Self::High
        } else if score >= 0.5 {
            Self::Medium
        } else {
            Self::Related
        }
    }
}

/// Short summary of a connected note inside `LinkContext`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectedSummary {
    pub note_id: Uuid,
    pub title: String,
}

/// An incoming edge summary with optional anchor context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacklinkSummary {
    pub source_id: Uuid,
    pub source_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor_text: Option<String>,
    /// Up to three sentences of the source body around the anchor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// Link-graph metadata attached to every search result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkContext {
    pub incoming_count: usize,
    pub outgoing_count: usize,
    pub total_connections: usize,
    /// Up to 5 connected-note summaries.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub connected: Vec<ConnectedSummary>,
    /// Up to 5 backlink summaries.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub backlinks: Vec<BacklinkSummary>,
}

/// A ranked search result with denormalized note fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub note_id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub pinned: bool,
    pub category: NoteCategory,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Relevance score, 0..~1.3 after recency boost.
    pub score: f32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matched_tags: Vec<String>,
    pub search_type: SearchType,
    pub tier: ResultTier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_context: Option<LinkContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_similarity: Option<f32>,
}

impl SearchResult {
    /// Build a result from a note snapshot with the given score and type.
    /// The tier is derived from the score; re-derive after boosting.
    pub fn from_note(
        note: &NoteSnapshot,
        score: f32,
        search_type: SearchType,
        matched_tags: Vec<String>,
    ) -> Self {
        Self {
            note_id: note.id,
            title: note.title.clone(),
            excerpt: note.body.as_deref().map(|b| excerpt(b, 160)),
            tags: note.tags.clone(),
            pinned: note.pinned,
            category: note.category,
            created_at: note.created_at,
            updated_at: note.updated_at,
            score,
            matched_tags,
            search_type,
            tier: ResultTier::from_score(score),
            link_context: None,
            semantic_similarity: None,
        }
    }
}

/// A "similar notes" entry from the link graph (Jaccard over connected
/// sets).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarNote {
    pub note_id: Uuid,
    pub title: String,
    /// Jaccard similarity in (0, 1].
    pub strength: f32,
}

/// A "most connected" (hub) entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectedNote {
    pub note_id: Uuid,
    pub title: String,
    pub connection_count: usize,
}

/// An autocomplete suggestion for an in-progress inline reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceSuggestion {
    pub note_id: Uuid,
    pub title: String,
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
}

// =============================================================================
// TESTS
// =============================================================================
