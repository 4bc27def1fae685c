use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use adapters::{
    Candidate, CandidateLookup, CompletionProvider, LookupError, MentionTagger, ProviderError,
    TaggedSpan, TaggerError,
};
use async_trait::async_trait;
use extract::TextChunk;
use graph::NodeKey;
use ontology::{Ontology, RelationSchema};
use pipeline::{CancelHandle, Pipeline, RetryConfig, RunConfig, Stage};
use tokio::sync::Notify;

/// Routes completion requests by payload shape: relation-extraction requests
/// carry an "entities" key in their JSON user content, filter requests don't.
struct MockProvider {
    filter_reply: Result<String, String>,
    relations_reply: Result<String, String>,
}

impl MockProvider {
    fn new(filter_reply: &str, relations_reply: &str) -> Self {
        Self {
            filter_reply: Ok(filter_reply.to_string()),
            relations_reply: Ok(relations_reply.to_string()),
        }
    }

    fn filter_unreachable(relations_reply: &str) -> Self {
        Self {
            filter_reply: Err("connection refused".to_string()),
            relations_reply: Ok(relations_reply.to_string()),
        }
    }
}

#[async_trait]
impl CompletionProvider for MockProvider {
    async fn complete(
        &self,
        _system: &str,
        user_content: &str,
        _json_mode: bool,
    ) -> Result<String, ProviderError> {
        let reply = if user_content.contains("\"entities\"") {
            &self.relations_reply
        } else {
            &self.filter_reply
        };
        reply.clone().map_err(ProviderError::Request)
    }
}

#[derive(Default)]
struct MockTagger {
    spans: HashMap<String, Vec<TaggedSpan>>,
    fail: bool,
    calls: AtomicUsize,
}

impl MockTagger {
    fn with_spans(entries: &[(&str, Vec<TaggedSpan>)]) -> Self {
        Self {
            spans: entries
                .iter()
                .map(|(text, spans)| (text.to_string(), spans.clone()))
                .collect(),
            ..Self::default()
        }
    }

    fn unavailable() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl MentionTagger for MockTagger {
    async fn tag(&self, text: &str) -> Result<Vec<TaggedSpan>, TaggerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(TaggerError::Unavailable("model offline".into()));
        }
        Ok(self.spans.get(text).cloned().unwrap_or_default())
    }
}

/// Tagger whose calls never return; signals once a call is in flight.
struct BlockingTagger {
    started: Arc<Notify>,
}

#[async_trait]
impl MentionTagger for BlockingTagger {
    async fn tag(&self, _text: &str) -> Result<Vec<TaggedSpan>, TaggerError> {
        self.started.notify_one();
        std::future::pending().await
    }
}

#[derive(Default)]
struct MockLookup {
    by_surface: HashMap<String, Vec<Candidate>>,
}

impl MockLookup {
    fn with_candidates(entries: &[(&str, Vec<Candidate>)]) -> Self {
        Self {
            by_surface: entries
                .iter()
                .map(|(surface, candidates)| (surface.to_string(), candidates.clone()))
                .collect(),
        }
    }
}

#[async_trait]
impl CandidateLookup for MockLookup {
    async fn lookup(
        &self,
        surface: &str,
        _context: Option<&str>,
    ) -> Result<Vec<Candidate>, LookupError> {
        Ok(self.by_surface.get(surface).cloned().unwrap_or_default())
    }
}

fn span(text: &str, surface: &str, coarse: &str) -> TaggedSpan {
    let start = text.find(surface).expect("surface not in text");
    TaggedSpan {
        start,
        end: start + surface.len(),
        surface: surface.to_string(),
        coarse_type: coarse.to_string(),
    }
}

fn candidate(kb_id: &str, label: &str, kb_type: &str, score: f64) -> Candidate {
    Candidate {
        kb_id: kb_id.to_string(),
        label: label.to_string(),
        kb_type: kb_type.to_string(),
        score,
    }
}

/// The built-in ontology plus a generic "supplies" relation that may target
/// a product as well as a company.
fn test_ontology() -> Ontology {
    let mut ontology = Ontology::supply_chain();
    ontology.relations.push(RelationSchema {
        name: "supplies".into(),
        subject_classes: vec!["Company".into()],
        object_classes: vec!["Company".into(), "Product".into()],
    });
    ontology
}

fn test_config() -> RunConfig {
    RunConfig {
        retry: RetryConfig {
            max_retries: 0,
            initial_backoff_ms: 1,
            max_backoff_ms: 1,
        },
        ..RunConfig::default()
    }
}

fn build_pipeline(
    provider: MockProvider,
    tagger: Arc<MockTagger>,
    lookup: MockLookup,
) -> Pipeline {
    Pipeline::with_adapters(
        test_config(),
        test_ontology(),
        Arc::new(provider),
        tagger,
        Arc::new(lookup),
    )
    .expect("valid configuration")
}

const RELEVANT: &str = r#"{"relevant": true, "rationale": "supply chain content"}"#;

#[tokio::test]
async fn single_chunk_builds_one_edge_with_provenance() {
    let text = "Bosch supplies the ABS module.";
    let chunk = TextChunk::new("doc-1", text);
    let chunk_id = chunk.chunk_id.clone();

    let tagger = Arc::new(MockTagger::with_spans(&[(
        text,
        vec![span(text, "Bosch", "ORG"), span(text, "ABS module", "MISC")],
    )]));
    let lookup = MockLookup::with_candidates(&[
        ("Bosch", vec![candidate("Q234021", "Bosch", "organization", 120.0)]),
        ("ABS module", vec![candidate("Q1130358", "ABS module", "product", 100.0)]),
    ]);
    let provider = MockProvider::new(
        RELEVANT,
        r#"{"relations": [["Bosch", "supplies", "ABS module"]]}"#,
    );

    let outcome = build_pipeline(provider, tagger, lookup).run(vec![chunk]).await;

    assert!(!outcome.report.has_failures());
    assert_eq!(outcome.graph.node_count(), 2);
    assert_eq!(outcome.graph.edge_count(), 1);

    let edge = outcome.graph.edges().next().unwrap();
    assert_eq!(edge.relation, "supplies");
    assert_eq!(edge.subject, NodeKey::Kb("Q234021".into()));
    assert_eq!(edge.object, NodeKey::Kb("Q1130358".into()));
    assert!(edge.provenance.contains(&chunk_id));
}

#[tokio::test]
async fn filter_failure_marks_undecided_and_still_processes() {
    let text = "Bosch makes brakes.";
    let chunk = TextChunk::new("doc-1", text);
    let chunk_id = chunk.chunk_id.clone();

    let tagger = Arc::new(MockTagger::with_spans(&[(
        text,
        vec![span(text, "Bosch", "ORG")],
    )]));
    let lookup = MockLookup::with_candidates(&[(
        "Bosch",
        vec![candidate("Q234021", "Bosch", "organization", 120.0)],
    )]);
    let provider = MockProvider::filter_unreachable(r#"{"relations": []}"#);

    let outcome = build_pipeline(provider, tagger.clone(), lookup)
        .run(vec![chunk])
        .await;

    // The chunk is never silently dropped: it was tagged and merged.
    assert_eq!(tagger.calls.load(Ordering::SeqCst), 1);
    assert_eq!(outcome.report.undecided, vec![chunk_id]);
    assert_eq!(outcome.report.chunks_merged, 1);
    assert!(!outcome.report.has_failures());
    assert_eq!(outcome.graph.node_count(), 1);
}

#[tokio::test]
async fn zero_mentions_is_not_an_error() {
    let chunk = TextChunk::new("doc-1", "Shipping lanes were busy this quarter.");

    let tagger = Arc::new(MockTagger::default());
    let provider = MockProvider::new(RELEVANT, r#"{"relations": []}"#);

    let outcome = build_pipeline(provider, tagger, MockLookup::default())
        .run(vec![chunk])
        .await;

    assert!(!outcome.report.has_failures());
    assert_eq!(outcome.report.chunks_merged, 1);
    assert!(outcome.graph.is_empty());
}

#[tokio::test]
async fn tagger_failure_is_reported_and_excluded() {
    let chunk = TextChunk::new("doc-1", "Bosch makes brakes.");
    let chunk_id = chunk.chunk_id.clone();

    let provider = MockProvider::new(RELEVANT, r#"{"relations": []}"#);
    let outcome = build_pipeline(provider, Arc::new(MockTagger::unavailable()), MockLookup::default())
        .run(vec![chunk])
        .await;

    assert_eq!(outcome.report.failures.len(), 1);
    let failure = &outcome.report.failures[0];
    assert_eq!(failure.chunk_id, chunk_id);
    assert_eq!(failure.stage, Stage::Tag);
    assert!(outcome.graph.is_empty());
    assert_eq!(outcome.report.chunks_merged, 0);
}

#[tokio::test]
async fn out_of_vocabulary_relation_never_reaches_the_graph() {
    let text = "Bosch owns the ABS module line.";
    let chunk = TextChunk::new("doc-1", text);

    let tagger = Arc::new(MockTagger::with_spans(&[(
        text,
        vec![span(text, "Bosch", "ORG"), span(text, "ABS module", "MISC")],
    )]));
    let lookup = MockLookup::with_candidates(&[
        ("Bosch", vec![candidate("Q234021", "Bosch", "organization", 120.0)]),
        ("ABS module", vec![candidate("Q1130358", "ABS module", "product", 100.0)]),
    ]);
    let provider = MockProvider::new(
        RELEVANT,
        r#"{"relations": [["Bosch", "ownedBy", "ABS module"]]}"#,
    );

    let outcome = build_pipeline(provider, tagger, lookup).run(vec![chunk]).await;

    assert_eq!(outcome.graph.edge_count(), 0);
    assert_eq!(outcome.report.discarded_triples, 1);
    // Discarded triples are recovered locally, not chunk failures.
    assert!(!outcome.report.has_failures());
}

#[tokio::test]
async fn unresolved_entities_stay_distinct_across_documents() {
    let text_a = "Acme Corp shipped parts in March.";
    let text_b = "Acme Corp opened a warehouse.";
    let chunk_a = TextChunk::new("doc-a", text_a);
    let chunk_b = TextChunk::new("doc-b", text_b);

    let tagger = Arc::new(MockTagger::with_spans(&[
        (text_a, vec![span(text_a, "Acme Corp", "ORG")]),
        (text_b, vec![span(text_b, "Acme Corp", "ORG")]),
    ]));
    // Top candidate stays below the acceptance threshold: never linked.
    let lookup = MockLookup::with_candidates(&[(
        "Acme Corp",
        vec![candidate("Q999", "Acme", "organization", 10.0)],
    )]);
    let provider = MockProvider::new(RELEVANT, r#"{"relations": []}"#);

    let outcome = build_pipeline(provider, tagger, lookup)
        .run(vec![chunk_a, chunk_b])
        .await;

    assert_eq!(outcome.graph.node_count(), 2);
    for node in outcome.graph.nodes() {
        assert_eq!(node.kb_id(), None);
    }
}

#[tokio::test]
async fn irrelevant_chunks_skip_downstream_stages() {
    let chunk = TextChunk::new("doc-1", "The election results came in late.");
    let chunk_id = chunk.chunk_id.clone();

    let tagger = Arc::new(MockTagger::default());
    let provider = MockProvider::new(
        r#"{"relevant": false, "rationale": "politics"}"#,
        r#"{"relations": []}"#,
    );

    let outcome = build_pipeline(provider, tagger.clone(), MockLookup::default())
        .run(vec![chunk])
        .await;

    assert_eq!(tagger.calls.load(Ordering::SeqCst), 0);
    assert_eq!(outcome.report.filtered_out, vec![chunk_id]);
    assert_eq!(outcome.report.chunks_merged, 0);
    assert!(outcome.graph.is_empty());
}

#[tokio::test]
async fn cancellation_skips_pending_chunks() {
    let chunk_a = TextChunk::new("doc-1", "Bosch makes brakes.");
    let chunk_b = TextChunk::new("doc-1", "Continental makes tires.");

    let provider = MockProvider::new(RELEVANT, r#"{"relations": []}"#);
    let pipeline = build_pipeline(provider, Arc::new(MockTagger::default()), MockLookup::default());

    let (handle, cancel) = CancelHandle::new();
    handle.cancel();
    let outcome = pipeline.run_with_cancel(vec![chunk_a, chunk_b], cancel).await;

    assert_eq!(outcome.report.cancelled.len(), 2);
    assert_eq!(outcome.report.chunks_merged, 0);
    assert!(outcome.graph.is_empty());
}

#[tokio::test]
async fn cancellation_aborts_in_flight_external_calls() {
    let chunk = TextChunk::new("doc-1", "Bosch makes brakes.");
    let chunk_id = chunk.chunk_id.clone();

    let started = Arc::new(Notify::new());
    let tagger = Arc::new(BlockingTagger {
        started: started.clone(),
    });
    let provider = MockProvider::new(RELEVANT, r#"{"relations": []}"#);
    let pipeline = Pipeline::with_adapters(
        test_config(),
        test_ontology(),
        Arc::new(provider),
        tagger,
        Arc::new(MockLookup::default()),
    )
    .expect("valid configuration");

    let (handle, cancel) = CancelHandle::new();
    let run = tokio::spawn(async move { pipeline.run_with_cancel(vec![chunk], cancel).await });

    // Cancel only once the tagger call is actually in flight.
    started.notified().await;
    handle.cancel();

    let outcome = run.await.expect("run task panicked");
    assert_eq!(outcome.report.cancelled, vec![chunk_id]);
    assert_eq!(outcome.report.chunks_merged, 0);
    assert!(outcome.graph.is_empty());
}

#[tokio::test]
async fn duplicate_chunk_merges_idempotently() {
    let text = "Bosch supplies the ABS module.";
    let chunk = TextChunk::new("doc-1", text);

    let tagger = Arc::new(MockTagger::with_spans(&[(
        text,
        vec![span(text, "Bosch", "ORG"), span(text, "ABS module", "MISC")],
    )]));
    let lookup = MockLookup::with_candidates(&[
        ("Bosch", vec![candidate("Q234021", "Bosch", "organization", 120.0)]),
        ("ABS module", vec![candidate("Q1130358", "ABS module", "product", 100.0)]),
    ]);
    let provider = MockProvider::new(
        RELEVANT,
        r#"{"relations": [["Bosch", "supplies", "ABS module"]]}"#,
    );

    let outcome = build_pipeline(provider, tagger, lookup)
        .run(vec![chunk.clone(), chunk])
        .await;

    // Same chunk twice collapses to the same nodes and edge.
    assert_eq!(outcome.graph.node_count(), 2);
    assert_eq!(outcome.graph.edge_count(), 1);
}
