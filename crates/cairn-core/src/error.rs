//! Error types for the cairn search engine.

use thiserror::Error;

/// Result type alias using cairn's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for cairn operations.
///
/// Degradable failures (`Embedding`, `VectorBackend`) are logged by the
/// pipeline and converted into fuzzy-only fallbacks; they should never
/// reach a caller of `search`. Fatal failures (`Index`, `Store`) propagate,
/// since there is no layer below the fuzzy index to fall back to.
#[derive(Error, Debug)]
pub enum Error {
    /// Query embedding generation failed
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Vector similarity backend failed
    #[error("Vector backend error: {0}")]
    VectorBackend(String),

    /// Fuzzy index construction or lookup failed
    #[error("Index error: {0}")]
    Index(String),

    /// Note or link store read failed
    #[error("Store error: {0}")]
    Store(String),

    /// Note not found
    #[error("Note not found: {0}")]
    NoteNotFound(uuid::Uuid),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this failure may be absorbed by falling back to a lesser
    /// signal: embedding and vector-backend failures degrade to
    /// fuzzy-only results.
    pub fn is_degradable(&self) -> bool {
        matches!(self, Error::Embedding(_) | Error::VectorBackend(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
