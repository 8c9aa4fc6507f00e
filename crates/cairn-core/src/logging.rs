//! Structured logging field name constants for cairn.
//!
//! All crates use these constants for consistent structured logging
//! fields, so log aggregation tools can query by standardized names
//! across every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Fatal failure surfaced to the caller |
//! | WARN  | Degradable failure, fuzzy-only fallback applied |
//! | INFO  | Query completions |
//! | DEBUG | Stage results, cache decisions, strategy choices |
//! | TRACE | Per-candidate scoring detail |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "search", "graph", "cache", "bracket"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "engine", "fuzzy_index", "semantic_merge", "result_cache"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "search", "find_similar", "resolve_reference"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Note UUID being operated on.
pub const NOTE_ID: &str = "note_id";

/// Search query text (normalized).
pub const QUERY: &str = "query";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of results returned.
pub const RESULT_COUNT: &str = "result_count";

/// Number of fuzzy candidates before merge.
pub const FUZZY_HITS: &str = "fuzzy_hits";

/// Number of semantic candidates before merge.
pub const SEMANTIC_HITS: &str = "semantic_hits";

/// Number of notes in the query snapshot.
pub const SNAPSHOT_SIZE: &str = "snapshot_size";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Whether the result came from the cache.
pub const CACHE_HIT: &str = "cache_hit";

/// Whether the semantic pass degraded to fuzzy-only.
pub const DEGRADED: &str = "degraded";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
