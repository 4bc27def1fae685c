use serde::Serialize;

use crate::model::{GraphEdge, GraphNode, KnowledgeGraph};

/// Serializable flat view of the graph.
#[derive(Debug, Serialize)]
pub struct GraphExport<'a> {
    pub nodes: Vec<&'a GraphNode>,
    pub edges: Vec<&'a GraphEdge>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntityRef {
    pub name: String,
    pub canonical_name: String,
    pub kb_id: Option<String>,
}

/// One edge in subject/predicate/object form.
#[derive(Debug, Clone, Serialize)]
pub struct Triple {
    pub subject: EntityRef,
    pub predicate: String,
    pub object: EntityRef,
    pub chunk_ids: Vec<String>,
}

impl KnowledgeGraph {
    pub fn to_export(&self) -> GraphExport<'_> {
        GraphExport {
            nodes: self.nodes().collect(),
            edges: self.edges().collect(),
        }
    }

    /// Flatten edges into triples, the shape downstream consumers expect.
    pub fn to_triples(&self) -> Vec<Triple> {
        self.edges()
            .map(|edge| {
                let entity_ref = |key| {
                    let node = self.node(key);
                    EntityRef {
                        name: node
                            .and_then(|n| n.surfaces.first().cloned())
                            .unwrap_or_default(),
                        canonical_name: node
                            .map(|n| n.canonical_label().to_string())
                            .unwrap_or_default(),
                        kb_id: node.and_then(|n| n.kb_id().map(str::to_string)),
                    }
                };
                Triple {
                    subject: entity_ref(&edge.subject),
                    predicate: edge.relation.clone(),
                    object: entity_ref(&edge.object),
                    chunk_ids: edge.provenance.iter().cloned().collect(),
                }
            })
            .collect()
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.to_export())
    }
}
