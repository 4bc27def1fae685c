use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Node identity. Linked entities are identified solely by their
/// knowledge-base id; unresolved entities by normalized surface string plus
/// source document, so they never merge across documents — and never merge
/// with a linked entity even when the surface strings match.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeKey {
    Kb(String),
    Unresolved { surface: String, doc_id: String },
}

/// Edge identity: parallel edges of different types between the same nodes
/// are distinct.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeKey {
    pub subject: NodeKey,
    pub relation: String,
    pub object: NodeKey,
}

/// All observations of one entity, deduplicated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub key: NodeKey,
    /// Canonical labels observed for this entity. Sets keep the merge
    /// order-independent; [`GraphNode::canonical_label`] picks one
    /// deterministically.
    pub labels: BTreeSet<String>,
    pub surfaces: BTreeSet<String>,
    pub kb_types: BTreeSet<String>,
    /// Chunk ids in which this entity was mentioned.
    pub provenance: BTreeSet<String>,
}

impl GraphNode {
    pub fn new(key: NodeKey) -> Self {
        Self {
            key,
            labels: BTreeSet::new(),
            surfaces: BTreeSet::new(),
            kb_types: BTreeSet::new(),
            provenance: BTreeSet::new(),
        }
    }

    pub fn canonical_label(&self) -> &str {
        self.labels.first().map(String::as_str).unwrap_or_default()
    }

    pub fn kb_id(&self) -> Option<&str> {
        match &self.key {
            NodeKey::Kb(id) => Some(id),
            NodeKey::Unresolved { .. } => None,
        }
    }
}

/// All observations of one (subject, relation, object) triple, deduplicated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub subject: NodeKey,
    pub relation: String,
    pub object: NodeKey,
    /// Maximum confidence observed across merges.
    pub confidence: f64,
    pub provenance: BTreeSet<String>,
}

/// The deduplicated graph for one extraction run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KnowledgeGraph {
    pub(crate) nodes: BTreeMap<NodeKey, GraphNode>,
    pub(crate) edges: BTreeMap<EdgeKey, GraphEdge>,
}

impl KnowledgeGraph {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node(&self, key: &NodeKey) -> Option<&GraphNode> {
        self.nodes.get(key)
    }

    pub fn edge(&self, key: &EdgeKey) -> Option<&GraphEdge> {
        self.edges.get(key)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &GraphEdge> {
        self.edges.values()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}
