//! # cairn-search
//!
//! The hybrid search engine: fuzzy lexical matching, optional semantic
//! similarity, score merging, result caching, and inline-reference
//! autocomplete, behind a single [`SearchEngine`] facade.
//!
//! ## Pipeline
//!
//! ```text
//! raw query
//!   └─ interpret (tags, temporal range, intent, category)
//!        ├─ fuzzy pass      (in-memory trigram index, always runs)
//!        └─ semantic pass   (embed + vector lookup, eligibility-gated,
//!                            degrades to fuzzy-only on failure)
//!              └─ merge + recency boost + tier + sort
//!                   └─ link-graph decoration
//!                        └─ bounded TTL cache
//! ```

pub mod bracket;
pub mod cache;
pub mod engine;
pub mod fuzzy;
pub mod hybrid;

pub use bracket::{detect_reference, BracketResolver, ReferenceTrigger};
pub use cache::{CacheConfig, CacheStats, ResultCache};
pub use engine::{SearchEngine, SearchMetadata};
pub use fuzzy::{FuzzyCandidate, FuzzyIndex};
pub use hybrid::{merge_candidates, HybridConfig};
