//! End-to-end tests for the search engine facade, using in-memory
//! store and backend fakes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use cairn_core::{
    EmbeddingProvider, Error, LinkEdge, LinkStore, NoteCategory, NoteSnapshot, NoteStore, Result,
    Scope, SearchFilters, SearchMode, SearchQuery, SearchType, VectorIndex, VectorMatch,
};
use cairn_search::SearchEngine;

// ── Fakes ────────────────────────────────────────────────────────────────

struct MemoryNoteStore {
    notes: Vec<NoteSnapshot>,
}

#[async_trait]
impl NoteStore for MemoryNoteStore {
    async fn list_notes(&self, _scope: &Scope) -> Result<Vec<NoteSnapshot>> {
        Ok(self.notes.clone())
    }
}

struct CountingNoteStore {
    notes: Vec<NoteSnapshot>,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl NoteStore for CountingNoteStore {
    async fn list_notes(&self, _scope: &Scope) -> Result<Vec<NoteSnapshot>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.notes.clone())
    }
}

struct MemoryLinkStore {
    edges: Vec<LinkEdge>,
}

#[async_trait]
impl LinkStore for MemoryLinkStore {
    async fn list_links(&self, _scope: &Scope) -> Result<Vec<LinkEdge>> {
        Ok(self.edges.clone())
    }
}

struct StaticEmbedder;

#[async_trait]
impl EmbeddingProvider for StaticEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![0.1, 0.2, 0.3])
    }
}

struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(Error::Embedding("provider unreachable".to_string()))
    }
}

struct StaticVectorIndex {
    matches: Vec<VectorMatch>,
}

#[async_trait]
impl VectorIndex for StaticVectorIndex {
    async fn find_similar(
        &self,
        _embedding: &[f32],
        min_similarity: f32,
        limit: usize,
    ) -> Result<Vec<VectorMatch>> {
        let mut matches: Vec<VectorMatch> = self
            .matches
            .iter()
            .filter(|m| m.similarity >= min_similarity)
            .cloned()
            .collect();
        matches.truncate(limit);
        Ok(matches)
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────────

fn old_timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 2, 9, 0, 0).unwrap()
}

fn note(title: &str, tags: &[&str]) -> NoteSnapshot {
    NoteSnapshot {
        id: Uuid::new_v4(),
        title: title.to_string(),
        body: None,
        tags: tags.iter().map(|t| t.to_string()).collect(),
        created_at: old_timestamp(),
        updated_at: old_timestamp(),
        pinned: false,
        category: NoteCategory::None,
        semantic_enabled: false,
    }
}

fn edge(source: Uuid, target: Uuid) -> LinkEdge {
    LinkEdge {
        source_id: source,
        target_id: target,
        anchor_text: None,
        canonical_title: "t".to_string(),
    }
}

fn engine(notes: Vec<NoteSnapshot>, edges: Vec<LinkEdge>) -> SearchEngine {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    SearchEngine::new(
        Arc::new(MemoryNoteStore { notes }),
        Arc::new(MemoryLinkStore { edges }),
    )
}

// ── Fuzzy path ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_text_query_matches_and_decorates() {
    let notes = vec![
        note("Project Alpha Kickoff", &["work"]),
        note("Alpha Testing Notes", &["research"]),
        note("Grocery List", &[]),
    ];
    let engine = engine(notes, Vec::new());
    let scope = Scope::default();

    let results = engine
        .search(&scope, &SearchQuery::new("alpha"))
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.title.contains("Alpha")));
    assert!(results.iter().all(|r| r.search_type == SearchType::Fuzzy));
    assert!(results.iter().all(|r| r.link_context.is_some()));
    // Descending by score, no duplicate note ids.
    assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    assert_ne!(results[0].note_id, results[1].note_id);
}

#[tokio::test]
async fn test_tag_query_strict_membership() {
    let notes = vec![
        note("Project Alpha Kickoff", &["work"]),
        note("Alpha Testing Notes", &["research"]),
    ];
    let expected = notes[0].id;
    let engine = engine(notes, Vec::new());

    let results = engine
        .search(&Scope::default(), &SearchQuery::new("#work"))
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].note_id, expected);
    assert_eq!(results[0].matched_tags, vec!["work"]);
}

#[tokio::test]
async fn test_exclude_tag_token() {
    let notes = vec![
        note("alpha draft", &["draft"]),
        note("alpha final", &["published"]),
    ];
    let expected = notes[1].id;
    let engine = engine(notes, Vec::new());

    let results = engine
        .search(&Scope::default(), &SearchQuery::new("alpha -#draft"))
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].note_id, expected);
}

#[tokio::test]
async fn test_temporal_phrase_filters_by_recency() {
    let now = Utc::now();
    let mut recent = note("Weekly sync notes", &[]);
    recent.created_at = now - Duration::days(3);
    recent.updated_at = now - Duration::days(3);
    let mut old = note("Old sync notes", &[]);
    old.created_at = now - Duration::days(60);
    old.updated_at = now - Duration::days(60);
    let expected = recent.id;
    let engine = engine(vec![recent, old], Vec::new());

    let results = engine
        .search(&Scope::default(), &SearchQuery::new("notes from last week"))
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].note_id, expected);
}

#[tokio::test]
async fn test_limit_truncates() {
    let notes: Vec<NoteSnapshot> = (0..10).map(|i| note(&format!("alpha {i}"), &[])).collect();
    let engine = engine(notes, Vec::new());

    let results = engine
        .search(&Scope::default(), &SearchQuery::new("alpha").with_limit(3))
        .await
        .unwrap();
    assert_eq!(results.len(), 3);
}

// ── Semantic path ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_semantic_results_merge_with_fuzzy() {
    let mut lexical = note("Rust ownership", &[]);
    lexical.semantic_enabled = true;
    let mut conceptual = note("Borrow checker deep dive", &[]);
    conceptual.semantic_enabled = true;
    let lexical_id = lexical.id;
    let conceptual_id = conceptual.id;

    let engine = engine(vec![lexical, conceptual], Vec::new()).with_semantic(
        Arc::new(StaticEmbedder),
        Arc::new(StaticVectorIndex {
            matches: vec![VectorMatch {
                note_id: conceptual_id,
                similarity: 0.8,
            }],
        }),
    );

    let (results, meta) = engine
        .search_with_metadata(
            &Scope::default(),
            &SearchQuery::new("ownership").force_semantic(),
        )
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(meta.semantic_hits, 1);
    assert!(!meta.degraded);
    let sem = results.iter().find(|r| r.note_id == conceptual_id).unwrap();
    assert_eq!(sem.search_type, SearchType::Semantic);
    assert_eq!(sem.semantic_similarity, Some(0.8));
    let fuz = results.iter().find(|r| r.note_id == lexical_id).unwrap();
    assert_eq!(fuz.search_type, SearchType::Fuzzy);
}

#[tokio::test]
async fn test_semantic_skips_notes_without_vectors() {
    // semantic_enabled defaults to false in the fixture.
    let n = note("Borrow checker deep dive", &[]);
    let id = n.id;
    let engine = engine(vec![n], Vec::new()).with_semantic(
        Arc::new(StaticEmbedder),
        Arc::new(StaticVectorIndex {
            matches: vec![VectorMatch {
                note_id: id,
                similarity: 0.9,
            }],
        }),
    );

    let (_, meta) = engine
        .search_with_metadata(
            &Scope::default(),
            &SearchQuery::new("ownership").force_semantic(),
        )
        .await
        .unwrap();
    assert_eq!(meta.semantic_hits, 0);
}

#[tokio::test]
async fn test_embedding_failure_degrades_to_fuzzy() {
    let n = note("Rust ownership", &[]);
    let id = n.id;
    let engine = engine(vec![n], Vec::new()).with_semantic(
        Arc::new(FailingEmbedder),
        Arc::new(StaticVectorIndex { matches: vec![] }),
    );

    let (results, meta) = engine
        .search_with_metadata(
            &Scope::default(),
            &SearchQuery::new("ownership").force_semantic(),
        )
        .await
        .unwrap();

    assert!(meta.degraded);
    assert_eq!(meta.semantic_hits, 0);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].note_id, id);
    assert_eq!(results[0].search_type, SearchType::Fuzzy);
}

// ── Graph operations ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_find_similar_by_shared_connections() {
    let a = note("a", &[]);
    let b = note("b", &[]);
    let c = note("c", &[]);
    let (a_id, b_id, c_id) = (a.id, b.id, c.id);
    let engine = engine(vec![a, b, c], vec![edge(a_id, b_id), edge(c_id, b_id)]);

    let similar = engine
        .find_similar(&Scope::default(), a_id)
        .await
        .unwrap();

    assert_eq!(similar.len(), 1);
    assert_eq!(similar[0].note_id, c_id);
    assert!((similar[0].strength - 1.0).abs() < f32::EPSILON);
}

#[tokio::test]
async fn test_find_similar_unknown_note() {
    let engine = engine(vec![note("a", &[])], Vec::new());
    let err = engine
        .find_similar(&Scope::default(), Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NoteNotFound(_)));
}

#[tokio::test]
async fn test_most_connected_hubs() {
    let hub = note("hub", &[]);
    let a = note("a", &[]);
    let b = note("b", &[]);
    let lonely = note("lonely", &[]);
    let hub_id = hub.id;
    let edges = vec![edge(a.id, hub_id), edge(b.id, hub_id), edge(hub_id, a.id)];
    let engine = engine(vec![hub, a, b, lonely], edges);

    let hubs = engine.most_connected(&Scope::default(), 2).await.unwrap();
    assert_eq!(hubs.len(), 2);
    assert_eq!(hubs[0].note_id, hub_id);
    assert_eq!(hubs[0].connection_count, 3);
}

#[tokio::test]
async fn test_most_connected_mode_reorders_results() {
    let hub = note("alpha hub", &[]);
    let spoke = note("alpha spoke", &[]);
    let other = note("alpha other", &[]);
    let hub_id = hub.id;
    let edges = vec![edge(spoke.id, hub_id), edge(other.id, hub_id)];
    let engine = engine(vec![hub, spoke, other], edges);

    let results = engine
        .search(
            &Scope::default(),
            &SearchQuery::new("alpha").with_mode(SearchMode::MostConnected),
        )
        .await
        .unwrap();

    assert_eq!(results[0].note_id, hub_id);
    assert_eq!(
        results[0].link_context.as_ref().unwrap().total_connections,
        2
    );
}

#[tokio::test]
async fn test_orphan_filter() {
    let linked = note("alpha linked", &[]);
    let orphan = note("alpha orphan", &[]);
    let other = note("other", &[]);
    let orphan_id = orphan.id;
    let edges = vec![edge(linked.id, other.id)];
    let engine = engine(vec![linked, orphan, other], edges);

    let results = engine
        .search(
            &Scope::default(),
            &SearchQuery::new("alpha").with_filters(SearchFilters::new().orphaned()),
        )
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].note_id, orphan_id);
}

// ── Cache behavior ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_repeat_query_served_from_cache() {
    let engine = engine(vec![note("Project Alpha Kickoff", &["work"])], Vec::new());
    let scope = Scope::default();
    let query = SearchQuery::new("alpha");

    let (first, meta) = engine.search_with_metadata(&scope, &query).await.unwrap();
    assert!(!meta.cache_hit);

    let (second, meta) = engine.search_with_metadata(&scope, &query).await.unwrap();
    assert!(meta.cache_hit);
    assert_eq!(first.len(), second.len());
    assert_eq!(first[0].note_id, second[0].note_id);

    engine.clear_cache();
    assert_eq!(engine.cache_stats().size, 0);
    let (_, meta) = engine.search_with_metadata(&scope, &query).await.unwrap();
    assert!(!meta.cache_hit);
}

#[tokio::test]
async fn test_limited_query_caches_full_result_set() {
    let notes: Vec<NoteSnapshot> = (0..10).map(|i| note(&format!("alpha {i}"), &[])).collect();
    let engine = engine(notes, Vec::new());
    let scope = Scope::default();

    let limited = engine
        .search(&scope, &SearchQuery::new("alpha").with_limit(2))
        .await
        .unwrap();
    assert_eq!(limited.len(), 2);

    // The follow-up unlimited query hits the cache and must still see
    // everything, not the truncated set handed to the first caller.
    let (full, meta) = engine
        .search_with_metadata(&scope, &SearchQuery::new("alpha"))
        .await
        .unwrap();
    assert!(meta.cache_hit);
    assert_eq!(full.len(), 10);

    // And a limited hit against the same entry truncates its own copy.
    let (limited_again, meta) = engine
        .search_with_metadata(&scope, &SearchQuery::new("alpha").with_limit(3))
        .await
        .unwrap();
    assert!(meta.cache_hit);
    assert_eq!(limited_again.len(), 3);
}

#[tokio::test]
async fn test_filtered_queries_bypass_cache() {
    let engine = engine(vec![note("alpha", &["work"])], Vec::new());
    let scope = Scope::default();

    let query = SearchQuery::new("alpha").with_filters(SearchFilters::new().with_tag("work"));
    let (_, meta) = engine.search_with_metadata(&scope, &query).await.unwrap();
    assert!(!meta.cache_hit);
    assert_eq!(engine.cache_stats().size, 0);
}

// ── Reference autocomplete ───────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_resolve_reference_suggests_notes() {
    let engine = engine(
        vec![
            note("Alpha Kickoff", &[]),
            note("Beta Review", &[]),
        ],
        Vec::new(),
    );

    let text = "see [[alpha";
    let suggestions = engine
        .resolve_reference(&Scope::default(), text, text.len())
        .await
        .unwrap();

    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].title, "Alpha Kickoff");
    assert_eq!(suggestions[0].slug, "alpha-kickoff");
}

#[tokio::test(start_paused = true)]
async fn test_reference_keystrokes_coalesce_store_fetches() {
    let calls = Arc::new(AtomicUsize::new(0));
    let store = Arc::new(CountingNoteStore {
        notes: vec![note("Alpha Kickoff", &[])],
        calls: Arc::clone(&calls),
    });
    let engine = Arc::new(SearchEngine::new(
        store,
        Arc::new(MemoryLinkStore { edges: Vec::new() }),
    ));

    let mut handles = Vec::new();
    for text in ["[[al", "[[alp", "[[alph"] {
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            engine
                .resolve_reference(&Scope::default(), text, text.len())
                .await
        }));
        tokio::time::advance(std::time::Duration::from_millis(50)).await;
    }
    tokio::time::advance(std::time::Duration::from_millis(400)).await;

    let mut outputs = Vec::new();
    for handle in handles {
        outputs.push(handle.await.unwrap().unwrap());
    }

    // Superseded keystrokes never reach the note store; only the final
    // one pays a fetch.
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(outputs[0].is_empty());
    assert!(outputs[1].is_empty());
    assert_eq!(outputs[2].len(), 1);
    assert_eq!(outputs[2][0].title, "Alpha Kickoff");
}

#[tokio::test(start_paused = true)]
async fn test_resolve_reference_outside_brackets() {
    let engine = engine(vec![note("Alpha", &[])], Vec::new());
    let suggestions = engine
        .resolve_reference(&Scope::default(), "plain text", 5)
        .await
        .unwrap();
    assert!(suggestions.is_empty());
}
