//! Bounded, TTL-based result cache.
//!
//! Keyed by normalized (lower-cased, trimmed) query text. Expiry and
//! capacity eviction are the only removal paths; there is no LRU-on-read
//! promotion. This is a TTL + bounded-FIFO cache, not an LRU cache: the
//! working set is small and past results mostly serve as a fallback when
//! the network is unavailable.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use cairn_core::SearchResult;

/// Default entry bound.
pub const DEFAULT_CAPACITY: usize = 50;

/// Default time-to-live.
pub const DEFAULT_TTL_SECS: i64 = 300;

/// Configuration for a cache instance.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub capacity: usize,
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            ttl: Duration::seconds(DEFAULT_TTL_SECS),
        }
    }
}

impl CacheConfig {
    /// Set the entry bound.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the time-to-live.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Cache observability snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub size: usize,
}

struct CacheEntry {
    results: Vec<SearchResult>,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

/// The engine's only mutable shared state; safe for concurrent
/// lookup/insert from multiple in-flight queries.
pub struct ResultCache {
    config: CacheConfig,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl ResultCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Look up a query, purging expired entries first. Falls back to a
    /// bidirectional substring scan whose cached results are re-filtered
    /// against the current query text; a filtered-to-empty set is a miss.
    pub fn lookup(&self, query: &str) -> Option<Vec<SearchResult>> {
        self.lookup_at(query, Utc::now())
    }

    /// `lookup` with an explicit evaluation instant.
    pub fn lookup_at(&self, query: &str, now: DateTime<Utc>) -> Option<Vec<SearchResult>> {
        let key = normalize(query);
        if key.is_empty() {
            return None;
        }
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        entries.retain(|_, entry| entry.expires_at > now);

        if let Some(entry) = entries.get(&key) {
            return Some(entry.results.clone());
        }

        // Partial match fallback: keys sorted for deterministic pick.
        let mut keys: Vec<&String> = entries
            .keys()
            .filter(|k| k.contains(&key) || key.contains(k.as_str()))
            .collect();
        keys.sort();
        for candidate in keys {
            let filtered: Vec<SearchResult> = entries[candidate]
                .results
                .iter()
                .filter(|r| result_mentions(r, &key))
                .cloned()
                .collect();
            if !filtered.is_empty() {
                debug!(
                    subsystem = "cache",
                    component = "result_cache",
                    query = %key,
                    matched_key = %candidate,
                    result_count = filtered.len(),
                    "Substring cache hit"
                );
                return Some(filtered);
            }
        }
        None
    }

    /// Insert a result set. Empty queries and empty result sets are not
    /// cached (negative results may be transient failures). Over-capacity
    /// insertion evicts oldest-by-insertion-time entries.
    pub fn insert(&self, query: &str, results: Vec<SearchResult>) {
        self.insert_at(query, results, Utc::now());
    }

    /// `insert` with an explicit evaluation instant.
    pub fn insert_at(&self, query: &str, results: Vec<SearchResult>, now: DateTime<Utc>) {
        let key = normalize(query);
        if key.is_empty() || results.is_empty() {
            return;
        }
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            key,
            CacheEntry {
                results,
                created_at: now,
                expires_at: now + self.config.ttl,
            },
        );
        while entries.len() > self.config.capacity {
            let oldest = entries
                .iter()
                .min_by(|(ka, a), (kb, b)| a.created_at.cmp(&b.created_at).then_with(|| ka.cmp(kb)))
                .map(|(k, _)| k.clone());
            match oldest {
                Some(k) => {
                    entries.remove(&k);
                }
                None => break,
            }
        }
    }

    /// Drop all entries unconditionally.
    pub fn clear(&self) {
        self.entries.lock().expect("cache lock poisoned").clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.entries.lock().expect("cache lock poisoned").len(),
        }
    }
}

fn normalize(query: &str) -> String {
    query.trim().to_lowercase()
}

/// Whether a cached result still mentions the query substring in its
/// title, excerpt, or tags.
///
/// Cached results are denormalized and keep only an excerpt of the
/// body, so a body-only mention past the excerpt cutoff misses here.
/// That errs toward a plain cache miss (a fresh search), never toward
/// serving an unrelated hit.
fn result_mentions(result: &SearchResult, query: &str) -> bool {
    result.title.to_lowercase().contains(query)
        || result
            .excerpt
            .as_deref()
            .is_some_and(|e| e.to_lowercase().contains(query))
        || result.tags.iter().any(|t| t.to_lowercase().contains(query))
}
