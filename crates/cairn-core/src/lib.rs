//! # cairn-core
//!
//! Core types, traits, and query interpretation for the cairn hybrid
//! search and knowledge-graph ranking engine.
//!
//! This crate provides the foundational data structures and trait
//! definitions that the other cairn crates depend on.

pub mod error;
pub mod logging;
pub mod models;
pub mod query;
pub mod temporal;
pub mod text;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use query::{interpret, InterpretedQuery, QueryIntent};
pub use temporal::{extract_temporal, DateRange, TemporalMatch};
pub use text::{excerpt, slugify};
pub use traits::{EmbeddingProvider, LinkStore, NoteStore, Scope, VectorIndex, VectorMatch};
