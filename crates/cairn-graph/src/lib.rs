//! # cairn-graph
//!
//! In-memory link-graph adjacency and the connection-based ranking
//! signals derived from it: backlink context, Jaccard "similar notes",
//! hub notes, orphan detection, and result decoration.
//!
//! The graph is built once per query snapshot and is read-only for the
//! query's lifetime.

use std::collections::{HashMap, HashSet};

use tracing::debug;
use uuid::Uuid;

use cairn_core::models::{
    BacklinkSummary, ConnectedNote, ConnectedSummary, LinkContext, LinkEdge, NoteSnapshot,
    SearchResult, SimilarNote,
};

pub mod context;

pub use context::{anchor_context, split_sentences};

/// Cap on "similar notes" results.
pub const SIMILAR_NOTES_CAP: usize = 10;

/// Cap on connected-note and backlink summaries in a `LinkContext`.
pub const CONTEXT_SUMMARY_CAP: usize = 5;

/// Adjacency view over one link-relation snapshot.
///
/// Edges whose source or target is absent from the note snapshot are
/// dangling and skipped at build time; they are not errors.
pub struct LinkGraph {
    incoming: HashMap<Uuid, Vec<LinkEdge>>,
    outgoing: HashMap<Uuid, Vec<LinkEdge>>,
    titles: HashMap<Uuid, String>,
    bodies: HashMap<Uuid, String>,
    /// Note ids in snapshot order, for deterministic iteration.
    note_ids: Vec<Uuid>,
}

impl LinkGraph {
    /// Build the adjacency view from a note snapshot and edge snapshot.
    pub fn build(notes: &[NoteSnapshot], edges: &[LinkEdge]) -> Self {
        let mut titles = HashMap::with_capacity(notes.len());
        let mut bodies = HashMap::new();
        let mut note_ids = Vec::with_capacity(notes.len());
        for note in notes {
            titles.insert(note.id, note.title.clone());
            if let Some(body) = &note.body {
                bodies.insert(note.id, body.clone());
            }
            note_ids.push(note.id);
        }

        let mut incoming: HashMap<Uuid, Vec<LinkEdge>> = HashMap::new();
        let mut outgoing: HashMap<Uuid, Vec<LinkEdge>> = HashMap::new();
        let mut dangling = 0usize;
        for edge in edges {
            if !titles.contains_key(&edge.source_id) || !titles.contains_key(&edge.target_id) {
                dangling += 1;
                continue;
            }
            outgoing
                .entry(edge.source_id)
                .or_default()
                .push(edge.clone());
            incoming
                .entry(edge.target_id)
                .or_default()
                .push(edge.clone());
        }

        debug!(
            subsystem = "graph",
            component = "link_graph",
            snapshot_size = notes.len(),
            edge_count = edges.len(),
            dangling,
            "Link graph built"
        );

        Self {
            incoming,
            outgoing,
            titles,
            bodies,
            note_ids,
        }
    }

    /// Incoming edges for a note.
    pub fn incoming(&self, id: Uuid) -> &[LinkEdge] {
        self.incoming.get(&id).map_or(&[], Vec::as_slice)
    }

    /// Outgoing edges for a note.
    pub fn outgoing(&self, id: Uuid) -> &[LinkEdge] {
        self.outgoing.get(&id).map_or(&[], Vec::as_slice)
    }

    /// Total connection count, `|incoming| + |outgoing|`.
    pub fn connection_count(&self, id: Uuid) -> usize {
        self.incoming(id).len() + self.outgoing(id).len()
    }

    /// A note is orphaned iff it has no incoming and no outgoing edges.
    pub fn is_orphan(&self, id: Uuid) -> bool {
        self.connection_count(id) == 0
    }

    /// The set of note ids connected to `id` in either direction,
    /// excluding `id` itself.
    pub fn neighbor_set(&self, id: Uuid) -> HashSet<Uuid> {
        let mut set = HashSet::new();
        for edge in self.incoming(id) {
            set.insert(edge.source_id);
        }
        for edge in self.outgoing(id) {
            set.insert(edge.target_id);
        }
        set.remove(&id);
        set
    }

    /// Jaccard index of the two notes' connected-id sets. Symmetric.
    pub fn jaccard(&self, a: Uuid, b: Uuid) -> f32 {
        let set_a = self.neighbor_set(a);
        let set_b = self.neighbor_set(b);
        if set_a.is_empty() || set_b.is_empty() {
            return 0.0;
        }
        let intersection = set_a.intersection(&set_b).count();
        let union = set_a.union(&set_b).count();
        intersection as f32 / union as f32
    }

    /// Notes most similar to `id` by shared connections, positive
    /// similarity only, descending, capped at [`SIMILAR_NOTES_CAP`].
    pub fn similar_notes(&self, id: Uuid) -> Vec<SimilarNote> {
        let base = self.neighbor_set(id);
        if base.is_empty() {
            return Vec::new();
        }

        let mut similar: Vec<SimilarNote> = self
            .note_ids
            .iter()
            .filter(|other| **other != id)
            .filter_map(|other| {
                let strength = self.jaccard(id, *other);
                if strength > 0.0 {
                    Some(SimilarNote {
                        note_id: *other,
                        title: self.titles.get(other).cloned().unwrap_or_default(),
                        strength,
                    })
                } else {
                    None
                }
            })
            .collect();

        similar.sort_by(|a, b| {
            b.strength
                .partial_cmp(&a.strength)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.note_id.cmp(&b.note_id))
        });
        similar.truncate(SIMILAR_NOTES_CAP);
        similar
    }

    /// Hub notes: all notes sorted by total connection count descending,
    /// zero-connection notes excluded, capped at `limit`.
    pub fn most_connected(&self, limit: usize) -> Vec<ConnectedNote> {
        let mut hubs: Vec<ConnectedNote> = self
            .note_ids
            .iter()
            .filter_map(|id| {
                let count = self.connection_count(*id);
                if count == 0 {
                    return None;
                }
                Some(ConnectedNote {
                    note_id: *id,
                    title: self.titles.get(id).cloned().unwrap_or_default(),
                    connection_count: count,
                })
            })
            .collect();

        hubs.sort_by(|a, b| {
            b.connection_count
                .cmp(&a.connection_count)
                .then_with(|| a.note_id.cmp(&b.note_id))
        });
        hubs.truncate(limit);
        hubs
    }

    /// Build the `LinkContext` for one note: counts, up to 5 connected
    /// summaries, up to 5 backlink summaries with anchor context.
    pub fn link_context(&self, id: Uuid) -> LinkContext {
        let incoming = self.incoming(id);
        let outgoing = self.outgoing(id);

        let mut seen = HashSet::new();
        let mut connected = Vec::new();
        for neighbor in outgoing
            .iter()
            .map(|e| e.target_id)
            .chain(incoming.iter().map(|e| e.source_id))
        {
            if neighbor == id || !seen.insert(neighbor) {
                continue;
            }
            connected.push(ConnectedSummary {
                note_id: neighbor,
                title: self.titles.get(&neighbor).cloned().unwrap_or_default(),
            });
            if connected.len() == CONTEXT_SUMMARY_CAP {
                break;
            }
        }

        let backlinks = incoming
            .iter()
            .take(CONTEXT_SUMMARY_CAP)
            .map(|edge| {
                let context = edge.anchor_text.as_deref().and_then(|anchor| {
                    self.bodies
                        .get(&edge.source_id)
                        .and_then(|body| anchor_context(body, anchor))
                });
                BacklinkSummary {
                    source_id: edge.source_id,
                    source_title: self.titles.get(&edge.source_id).cloned().unwrap_or_default(),
                    anchor_text: edge.anchor_text.clone(),
                    context,
                }
            })
            .collect();

        LinkContext {
            incoming_count: incoming.len(),
            outgoing_count: outgoing.len(),
            total_connections: incoming.len() + outgoing.len(),
            connected,
            backlinks,
        }
    }

    /// Attach `LinkContext` to every result. Pure post-processing: the
    /// ranking order established upstream is left untouched.
    pub fn decorate(&self, results: &mut [SearchResult]) {
        for result in results.iter_mut() {
            result.link_context = Some(self.link_context(result.note_id));
        }
    }
}
