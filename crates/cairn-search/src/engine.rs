//! The search engine facade.
//!
//! One query flows through: cache lookup, interpretation, snapshot fetch,
//! fuzzy pass, optional semantic pass, merge, link-graph decoration,
//! cache populate. Embedding and vector-backend failures degrade to
//! fuzzy-only results; note-store and index failures propagate. A
//! generation counter drops stale cache populates when queries overlap.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use tokio::time::timeout;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use cairn_core::{
    interpret, ConnectedNote, EmbeddingProvider, Error, LinkStore, NoteSnapshot, NoteStore,
    ReferenceSuggestion, Result, Scope, SearchFilters, SearchMode, SearchQuery, SearchResult,
    SimilarNote, VectorIndex, VectorMatch,
};
use cairn_graph::LinkGraph;

use crate::bracket::BracketResolver;
use crate::cache::{CacheConfig, CacheStats, ResultCache};
use crate::fuzzy::{FuzzyCandidate, FuzzyIndex};
use crate::hybrid::{merge_candidates, HybridConfig};

/// Per-query observability fields, returned alongside results.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchMetadata {
    pub fuzzy_hits: usize,
    pub semantic_hits: usize,
    pub duration_ms: u64,
    /// True when the semantic pass failed or timed out and the results
    /// are fuzzy-only.
    pub degraded: bool,
    pub cache_hit: bool,
}

/// Hybrid search engine over external note/link stores.
///
/// The engine holds no note data of its own; every query re-fetches a
/// snapshot and finishes against it. Constructed once and shared.
pub struct SearchEngine {
    notes: Arc<dyn NoteStore>,
    links: Arc<dyn LinkStore>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    vectors: Option<Arc<dyn VectorIndex>>,
    hybrid: HybridConfig,
    cache: ResultCache,
    resolver: BracketResolver,
    generation: AtomicU64,
}

impl SearchEngine {
    /// Create an engine with no semantic backend (fuzzy-only).
    pub fn new(notes: Arc<dyn NoteStore>, links: Arc<dyn LinkStore>) -> Self {
        Self {
            notes,
            links,
            embedder: None,
            vectors: None,
            hybrid: HybridConfig::default(),
            cache: ResultCache::default(),
            resolver: BracketResolver::default(),
            generation: AtomicU64::new(0),
        }
    }

    /// Attach the embedding provider and vector backend.
    pub fn with_semantic(
        mut self,
        embedder: Arc<dyn EmbeddingProvider>,
        vectors: Arc<dyn VectorIndex>,
    ) -> Self {
        self.embedder = Some(embedder);
        self.vectors = Some(vectors);
        self
    }

    /// Replace the merge configuration.
    pub fn with_hybrid_config(mut self, config: HybridConfig) -> Self {
        self.hybrid = config;
        self
    }

    /// Replace the cache configuration.
    pub fn with_cache_config(mut self, config: CacheConfig) -> Self {
        self.cache = ResultCache::new(config);
        self
    }

    /// Replace the bracket resolver (custom debounce).
    pub fn with_resolver(mut self, resolver: BracketResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Run a search query. See [`Self::search_with_metadata`].
    pub async fn search(&self, scope: &Scope, query: &SearchQuery) -> Result<Vec<SearchResult>> {
        self.search_with_metadata(scope, query)
            .await
            .map(|(results, _)| results)
    }

    /// Run a search query, also returning per-query observability fields.
    #[instrument(skip(self, scope, query), fields(query = %query.text, mode = ?query.mode))]
    pub async fn search_with_metadata(
        &self,
        scope: &Scope,
        query: &SearchQuery,
    ) -> Result<(Vec<SearchResult>, SearchMetadata)> {
        let started = Instant::now();
        let now = Utc::now();
        let mut meta = SearchMetadata::default();

        // Cache is keyed on text alone, so only plain combined-mode
        // queries are eligible.
        let cacheable = query.filters.is_empty()
            && query.mode == SearchMode::Combined
            && !query.force_semantic;
        if cacheable {
            if let Some(mut cached) = self.cache.lookup(&query.text) {
                if let Some(limit) = query.limit {
                    cached.truncate(limit);
                }
                meta.cache_hit = true;
                meta.fuzzy_hits = cached.len();
                meta.duration_ms = started.elapsed().as_millis() as u64;
                info!(
                    subsystem = "search",
                    component = "engine",
                    result_count = cached.len(),
                    cache_hit = true,
                    duration_ms = meta.duration_ms,
                    "Search served from cache"
                );
                return Ok((cached, meta));
            }
        }

        let token = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let interpreted = interpret(&query.text, now);
        let notes = self.notes.list_notes(scope).await?;
        let edges = match self.links.list_links(scope).await {
            Ok(edges) => edges,
            Err(error) if error.is_degradable() => {
                warn!(
                    subsystem = "search",
                    component = "engine",
                    error = %error,
                    degraded = true,
                    "Link store unavailable; searching without graph signals"
                );
                Vec::new()
            }
            Err(error) => return Err(error),
        };

        let graph = LinkGraph::build(&notes, &edges);
        let index = FuzzyIndex::build(&notes)?;
        let note_map: HashMap<Uuid, &NoteSnapshot> = notes.iter().map(|n| (n.id, n)).collect();

        let filters = effective_filters(&query.filters, &interpreted);
        let tag_mode = query.mode == SearchMode::Tags
            || (interpreted.residual.is_empty() && !filters.include_tags.is_empty());

        let candidates = if tag_mode {
            index.search_tags(&filters.include_tags)
        } else {
            index.search(&interpreted.residual)
        };
        let fuzzy: Vec<FuzzyCandidate> = candidates
            .into_iter()
            .filter(|c| {
                note_map
                    .get(&c.note_id)
                    .is_some_and(|note| passes(note, &filters, &graph))
            })
            .collect();
        meta.fuzzy_hits = fuzzy.len();

        let semantic_wanted = !tag_mode
            && !interpreted.residual.is_empty()
            && (query.force_semantic
                || interpreted.semantic_eligible
                || query.mode == SearchMode::Similarity);
        let semantic: Vec<VectorMatch> = if semantic_wanted {
            let (matches, degraded) = self.semantic_candidates(&interpreted.residual).await?;
            meta.degraded = degraded;
            matches
                .into_iter()
                .filter(|m| {
                    note_map
                        .get(&m.note_id)
                        .is_some_and(|note| note.semantic_enabled && passes(note, &filters, &graph))
                })
                .collect()
        } else {
            Vec::new()
        };
        meta.semantic_hits = semantic.len();

        let mut results = merge_candidates(&fuzzy, &semantic, &note_map, &self.hybrid, now);

        if query.mode == SearchMode::MostConnected {
            results.sort_by(|a, b| {
                graph
                    .connection_count(b.note_id)
                    .cmp(&graph.connection_count(a.note_id))
                    .then_with(|| a.note_id.cmp(&b.note_id))
            });
        }

        graph.decorate(&mut results);

        // Populate with the untruncated set, and only if no newer query
        // superseded this one while the stores were in flight; the
        // caller's limit applies to the returned copy alone.
        if cacheable && self.generation.load(Ordering::SeqCst) == token {
            self.cache.insert(&query.text, results.clone());
        }
        if let Some(limit) = query.limit {
            results.truncate(limit);
        }

        meta.duration_ms = started.elapsed().as_millis() as u64;
        info!(
            subsystem = "search",
            component = "engine",
            snapshot_size = notes.len(),
            fuzzy_hits = meta.fuzzy_hits,
            semantic_hits = meta.semantic_hits,
            result_count = results.len(),
            degraded = meta.degraded,
            cache_hit = false,
            duration_ms = meta.duration_ms,
            "Search complete"
        );
        Ok((results, meta))
    }

    /// Notes most similar to `note_id` by shared link-graph connections.
    #[instrument(skip(self, scope))]
    pub async fn find_similar(&self, scope: &Scope, note_id: Uuid) -> Result<Vec<SimilarNote>> {
        let notes = self.notes.list_notes(scope).await?;
        if !notes.iter().any(|n| n.id == note_id) {
            return Err(Error::NoteNotFound(note_id));
        }
        let edges = self.links.list_links(scope).await?;
        let graph = LinkGraph::build(&notes, &edges);
        Ok(graph.similar_notes(note_id))
    }

    /// The top hub notes by total connection count.
    #[instrument(skip(self, scope))]
    pub async fn most_connected(&self, scope: &Scope, limit: usize) -> Result<Vec<ConnectedNote>> {
        let notes = self.notes.list_notes(scope).await?;
        let edges = self.links.list_links(scope).await?;
        let graph = LinkGraph::build(&notes, &edges);
        Ok(graph.most_connected(limit))
    }

    /// Resolve autocomplete suggestions for the inline reference at
    /// `cursor`, debounced. The snapshot fetch is deferred until the
    /// quiet period ends, so superseded keystrokes never hit the store.
    pub async fn resolve_reference(
        &self,
        scope: &Scope,
        text: &str,
        cursor: usize,
    ) -> Result<Vec<ReferenceSuggestion>> {
        self.resolver
            .resolve_with(text, cursor, self.notes.list_notes(scope))
            .await
    }

    /// Drop all cached result sets.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Run the embedding and vector lookups under the configured timeout.
    /// Degradable failures return `(empty, true)`; fatal errors propagate.
    async fn semantic_candidates(&self, text: &str) -> Result<(Vec<VectorMatch>, bool)> {
        let (Some(embedder), Some(vectors)) = (&self.embedder, &self.vectors) else {
            return Ok((Vec::new(), false));
        };

        let embedding = match timeout(self.hybrid.semantic_timeout, embedder.embed(text)).await {
            Ok(Ok(embedding)) => embedding,
            Ok(Err(error)) if error.is_degradable() => {
                warn!(
                    subsystem = "search",
                    component = "semantic",
                    error = %error,
                    degraded = true,
                    "Embedding failed; falling back to fuzzy-only"
                );
                return Ok((Vec::new(), true));
            }
            Ok(Err(error)) => return Err(error),
            Err(_) => {
                warn!(
                    subsystem = "search",
                    component = "semantic",
                    degraded = true,
                    "Embedding timed out; falling back to fuzzy-only"
                );
                return Ok((Vec::new(), true));
            }
        };

        match timeout(
            self.hybrid.semantic_timeout,
            vectors.find_similar(
                &embedding,
                self.hybrid.min_semantic_similarity,
                self.hybrid.semantic_limit,
            ),
        )
        .await
        {
            Ok(Ok(matches)) => Ok((matches, false)),
            Ok(Err(error)) if error.is_degradable() => {
                warn!(
                    subsystem = "search",
                    component = "semantic",
                    error = %error,
                    degraded = true,
                    "Vector lookup failed; falling back to fuzzy-only"
                );
                Ok((Vec::new(), true))
            }
            Ok(Err(error)) => Err(error),
            Err(_) => {
                warn!(
                    subsystem = "search",
                    component = "semantic",
                    degraded = true,
                    "Vector lookup timed out; falling back to fuzzy-only"
                );
                Ok((Vec::new(), true))
            }
        }
    }
}

/// Fold interpreter signals into the caller's filters. Caller-supplied
/// values win for the scalar fields; tag lists are unioned.
fn effective_filters(
    base: &SearchFilters,
    interpreted: &cairn_core::InterpretedQuery,
) -> SearchFilters {
    let mut filters = base.clone();
    for tag in &interpreted.include_tags {
        if !filters.include_tags.contains(tag) {
            filters.include_tags.push(tag.clone());
        }
    }
    for tag in &interpreted.exclude_tags {
        if !filters.exclude_tags.contains(tag) {
            filters.exclude_tags.push(tag.clone());
        }
    }
    if filters.date_range.is_none() {
        filters.date_range = interpreted.date_range;
    }
    if filters.category.is_none() {
        filters.category = interpreted.category;
    }
    filters
}

/// Whether a note passes the full filter set against the current graph.
///
/// Tag filters use case-insensitive substring containment; date ranges
/// accept either timestamp so "notes from last week" finds both notes
/// created and notes touched in the window.
fn passes(note: &NoteSnapshot, filters: &SearchFilters, graph: &LinkGraph) -> bool {
    if !filters.include_tags.is_empty() {
        let tags_lower: Vec<String> = note.tags.iter().map(|t| t.to_lowercase()).collect();
        let all = filters.include_tags.iter().all(|q| {
            let q = q.to_lowercase();
            tags_lower.iter().any(|t| t.contains(&q))
        });
        if !all {
            return false;
        }
    }
    if !filters.exclude_tags.is_empty() {
        let tags_lower: Vec<String> = note.tags.iter().map(|t| t.to_lowercase()).collect();
        let any = filters.exclude_tags.iter().any(|q| {
            let q = q.to_lowercase();
            tags_lower.iter().any(|t| t.contains(&q))
        });
        if any {
            return false;
        }
    }
    if let Some(range) = &filters.date_range {
        if !range.contains(note.updated_at) && !range.contains(note.created_at) {
            return false;
        }
    }
    if let Some(category) = filters.category {
        if note.category != category {
            return false;
        }
    }
    if filters.pinned_only && !note.pinned {
        return false;
    }
    if let Some(target) = filters.connected_to {
        if !graph.outgoing(note.id).iter().any(|e| e.target_id == target) {
            return false;
        }
    }
    if let Some(source) = filters.connected_from {
        if !graph.incoming(note.id).iter().any(|e| e.source_id == source) {
            return false;
        }
    }
    let connections = graph.connection_count(note.id);
    if let Some(min) = filters.min_connections {
        if connections < min {
            return false;
        }
    }
    if let Some(max) = filters.max_connections {
        if connections > max {
            return false;
        }
    }
    if filters.orphaned_only && !graph.is_orphan(note.id) {
        return false;
    }
    true
}
