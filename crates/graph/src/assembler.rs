use extract::{ChunkExtraction, RelationCandidate, ResolvedEntity, normalize_surface};
use tracing::debug;

use crate::model::{EdgeKey, GraphEdge, GraphNode, KnowledgeGraph, NodeKey};

/// Merges per-chunk extraction output into one deduplicated graph.
///
/// The merge is commutative and idempotent: chunks may arrive in any order
/// (or twice) and the final graph is identical. The assembler is the single
/// writer over the in-progress graph.
#[derive(Debug, Default)]
pub struct GraphAssembler {
    graph: KnowledgeGraph,
}

impl GraphAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge_chunk(&mut self, extraction: &ChunkExtraction) {
        for entity in &extraction.entities {
            self.merge_entity(&extraction.doc_id, &extraction.chunk_id, entity);
        }
        for relation in &extraction.relations {
            self.merge_relation(&extraction.doc_id, relation);
        }
        debug!(
            chunk_id = %extraction.chunk_id,
            nodes = self.graph.node_count(),
            edges = self.graph.edge_count(),
            "merged chunk"
        );
    }

    pub fn finish(self) -> KnowledgeGraph {
        self.graph
    }

    fn node_key(doc_id: &str, entity: &ResolvedEntity) -> NodeKey {
        match &entity.kb_id {
            Some(id) => NodeKey::Kb(id.clone()),
            None => NodeKey::Unresolved {
                surface: normalize_surface(&entity.canonical_label),
                doc_id: doc_id.to_string(),
            },
        }
    }

    fn merge_entity(&mut self, doc_id: &str, chunk_id: &str, entity: &ResolvedEntity) -> NodeKey {
        let key = Self::node_key(doc_id, entity);
        let node = self
            .graph
            .nodes
            .entry(key.clone())
            .or_insert_with(|| GraphNode::new(key.clone()));
        node.labels.insert(entity.canonical_label.clone());
        node.surfaces.insert(entity.mention.surface.clone());
        if let Some(kb_type) = &entity.kb_type {
            node.kb_types.insert(kb_type.clone());
        }
        node.provenance.insert(chunk_id.to_string());
        key
    }

    fn merge_relation(&mut self, doc_id: &str, relation: &RelationCandidate) {
        let subject = self.merge_entity(doc_id, &relation.chunk_id, &relation.subject);
        let object = self.merge_entity(doc_id, &relation.chunk_id, &relation.object);

        let key = EdgeKey {
            subject: subject.clone(),
            relation: relation.relation.clone(),
            object: object.clone(),
        };
        let edge = self.graph.edges.entry(key).or_insert_with(|| GraphEdge {
            subject,
            relation: relation.relation.clone(),
            object,
            confidence: f64::NEG_INFINITY,
            provenance: Default::default(),
        });
        edge.confidence = edge.confidence.max(relation.confidence);
        edge.provenance.insert(relation.chunk_id.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use extract::{Mention, TextChunk};

    fn entity(chunk: &TextChunk, surface: &str, kb_id: Option<&str>) -> ResolvedEntity {
        let mention = Mention {
            chunk_id: chunk.chunk_id.clone(),
            start: 0,
            end: surface.len(),
            surface: surface.into(),
            coarse_type: "ORG".into(),
        };
        match kb_id {
            Some(id) => ResolvedEntity::linked(
                mention,
                id.into(),
                surface.into(),
                "organization".into(),
                120.0,
            ),
            None => ResolvedEntity::unresolved(mention),
        }
    }

    fn relation(
        chunk: &TextChunk,
        subject: &ResolvedEntity,
        name: &str,
        object: &ResolvedEntity,
        confidence: f64,
    ) -> RelationCandidate {
        RelationCandidate {
            chunk_id: chunk.chunk_id.clone(),
            subject: subject.clone(),
            relation: name.into(),
            object: object.clone(),
            confidence,
        }
    }

    fn extraction(chunk: &TextChunk, entities: Vec<ResolvedEntity>, relations: Vec<RelationCandidate>) -> ChunkExtraction {
        ChunkExtraction {
            doc_id: chunk.doc_id.clone(),
            chunk_id: chunk.chunk_id.clone(),
            entities,
            relations,
        }
    }

    fn two_chunk_fixture() -> (ChunkExtraction, ChunkExtraction) {
        let c1 = TextChunk::new("doc-1", "Bosch supplies Audi.");
        let bosch = entity(&c1, "Bosch", Some("Q234021"));
        let audi = entity(&c1, "Audi", Some("Q23317"));
        let r1 = relation(&c1, &bosch, "suppliesTo", &audi, 0.7);
        let e1 = extraction(&c1, vec![bosch, audi], vec![r1]);

        let c2 = TextChunk::new("doc-1", "Bosch also delivers to Audi.");
        let bosch2 = entity(&c2, "BOSCH", Some("Q234021"));
        let audi2 = entity(&c2, "Audi AG", Some("Q23317"));
        let r2 = relation(&c2, &bosch2, "suppliesTo", &audi2, 1.0);
        let e2 = extraction(&c2, vec![bosch2, audi2], vec![r2]);

        (e1, e2)
    }

    #[test]
    fn merge_is_commutative() {
        let (e1, e2) = two_chunk_fixture();

        let mut forward = GraphAssembler::new();
        forward.merge_chunk(&e1);
        forward.merge_chunk(&e2);

        let mut backward = GraphAssembler::new();
        backward.merge_chunk(&e2);
        backward.merge_chunk(&e1);

        assert_eq!(forward.finish(), backward.finish());
    }

    #[test]
    fn merge_is_idempotent() {
        let (e1, _) = two_chunk_fixture();

        let mut once = GraphAssembler::new();
        once.merge_chunk(&e1);

        let mut twice = GraphAssembler::new();
        twice.merge_chunk(&e1);
        twice.merge_chunk(&e1);

        assert_eq!(once.finish(), twice.finish());
    }

    #[test]
    fn same_kb_id_merges_into_one_node() {
        let (e1, e2) = two_chunk_fixture();
        let mut assembler = GraphAssembler::new();
        assembler.merge_chunk(&e1);
        assembler.merge_chunk(&e2);
        let graph = assembler.finish();

        assert_eq!(graph.node_count(), 2);
        let bosch = graph.node(&NodeKey::Kb("Q234021".into())).unwrap();
        assert_eq!(bosch.provenance.len(), 2);
        assert!(bosch.surfaces.contains("Bosch") && bosch.surfaces.contains("BOSCH"));
    }

    #[test]
    fn edge_confidence_aggregates_by_max() {
        let (e1, e2) = two_chunk_fixture();
        let mut assembler = GraphAssembler::new();
        assembler.merge_chunk(&e1);
        assembler.merge_chunk(&e2);
        let graph = assembler.finish();

        assert_eq!(graph.edge_count(), 1);
        let edge = graph.edges().next().unwrap();
        assert_eq!(edge.confidence, 1.0);
        assert_eq!(edge.provenance.len(), 2);
    }

    #[test]
    fn unresolved_entities_never_merge_across_documents() {
        let c1 = TextChunk::new("doc-1", "Acme Corp ships widgets.");
        let c2 = TextChunk::new("doc-2", "Acme Corp ships gadgets.");
        let e1 = extraction(&c1, vec![entity(&c1, "Acme Corp", None)], vec![]);
        let e2 = extraction(&c2, vec![entity(&c2, "Acme Corp", None)], vec![]);

        let mut assembler = GraphAssembler::new();
        assembler.merge_chunk(&e1);
        assembler.merge_chunk(&e2);
        assert_eq!(assembler.finish().node_count(), 2);
    }

    #[test]
    fn unresolved_entities_merge_within_a_document() {
        let c1 = TextChunk::new("doc-1", "Acme Corp ships widgets.");
        let c2 = TextChunk::new("doc-1", "ACME CORP ships gadgets.");
        let e1 = extraction(&c1, vec![entity(&c1, "Acme Corp", None)], vec![]);
        let e2 = extraction(&c2, vec![entity(&c2, "ACME CORP.", None)], vec![]);

        let mut assembler = GraphAssembler::new();
        assembler.merge_chunk(&e1);
        assembler.merge_chunk(&e2);
        assert_eq!(assembler.finish().node_count(), 1);
    }

    #[test]
    fn unresolved_never_merges_with_linked_despite_same_surface() {
        let c1 = TextChunk::new("doc-1", "Bosch supplies Audi.");
        let linked = entity(&c1, "Bosch", Some("Q234021"));
        let unlinked = entity(&c1, "Bosch", None);
        let e = extraction(&c1, vec![linked, unlinked], vec![]);

        let mut assembler = GraphAssembler::new();
        assembler.merge_chunk(&e);
        assert_eq!(assembler.finish().node_count(), 2);
    }

    #[test]
    fn parallel_edges_of_different_types_stay_distinct() {
        let c1 = TextChunk::new("doc-1", "Bosch supplies and produces for Audi.");
        let bosch = entity(&c1, "Bosch", Some("Q234021"));
        let audi = entity(&c1, "Audi", Some("Q23317"));
        let e = extraction(
            &c1,
            vec![bosch.clone(), audi.clone()],
            vec![
                relation(&c1, &bosch, "suppliesTo", &audi, 1.0),
                relation(&c1, &bosch, "produces", &audi, 1.0),
            ],
        );

        let mut assembler = GraphAssembler::new();
        assembler.merge_chunk(&e);
        assert_eq!(assembler.finish().edge_count(), 2);
    }
}
