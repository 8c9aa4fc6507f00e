//! External-interface traits for cairn.
//!
//! These are the engine's only seams to the outside world: the note and
//! link stores supply read snapshots, and the embedding provider and
//! vector index are treated as black boxes. Concrete implementations
//! live with the host application; tests use in-memory fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{LinkEdge, NoteSnapshot};

/// Opaque per-user scope passed through to the stores.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
}

impl Scope {
    pub fn for_user(user_id: Uuid) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }
}

/// Read-only note snapshot source. An eventually-consistent snapshot is
/// acceptable; the engine finishes each query against the snapshot it
/// fetched, even if the store refreshes mid-query.
#[async_trait]
pub trait NoteStore: Send + Sync {
    async fn list_notes(&self, scope: &Scope) -> Result<Vec<NoteSnapshot>>;
}

/// Read-only link-relation snapshot source.
#[async_trait]
pub trait LinkStore: Send + Sync {
    async fn list_links(&self, scope: &Scope) -> Result<Vec<LinkEdge>>;
}

/// External embedding computation. Failures are degradable: the pipeline
/// falls back to fuzzy-only results.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// A single vector-similarity match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorMatch {
    pub note_id: Uuid,
    pub similarity: f32,
}

/// External vector-similarity backend. Results may reference notes no
/// longer in the snapshot (stale vectors); the merger drops those.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn find_similar(
        &self,
        embedding: &[f32],
        min_similarity: f32,
        limit: usize,
    ) -> Result<Vec<VectorMatch>>;
}
