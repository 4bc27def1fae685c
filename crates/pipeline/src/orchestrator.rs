use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use adapters::{
    CandidateLookup, CompletionProvider, HttpTagger, MentionTagger, RetryPolicy, WikidataLookup,
    build_provider,
};
use extract::{
    ChunkExtraction, EntityResolver, FilterDecision, Mention, OntologyFilter, RelationExtractor,
    TextChunk,
};
use graph::{GraphAssembler, KnowledgeGraph};
use ontology::{ConfigurationError, Ontology};
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::config::RunConfig;
use crate::report::{ChunkFailure, RunReport, Stage};

/// The assembled graph plus the partial-failure report for one run.
#[derive(Debug)]
pub struct RunOutcome {
    pub graph: KnowledgeGraph,
    pub report: RunReport,
}

/// Cooperative cancellation, safe to trigger between chunks: chunks not yet
/// dispatched are skipped and in-flight external calls are abandoned.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, rx)
    }

    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Sequences filter → tag → resolve → relations per chunk and merges the
/// per-chunk output into one graph. Chunks are processed concurrently with no
/// ordering guarantee; the merge is commutative so the result is stable.
pub struct Pipeline {
    inner: Arc<PipelineInner>,
}

struct PipelineInner {
    config: RunConfig,
    filter: OntologyFilter,
    resolver: EntityResolver,
    relations: RelationExtractor,
    tagger: Arc<dyn MentionTagger>,
    retry: RetryPolicy,
}

enum ChunkOutcome {
    FilteredOut,
    Extracted {
        extraction: ChunkExtraction,
        undecided: bool,
        discarded: usize,
    },
    Failed {
        stage: Stage,
        reason: String,
    },
    Cancelled,
}

struct ChunkResult {
    doc_id: String,
    chunk_id: String,
    outcome: ChunkOutcome,
    linking: Duration,
}

impl Pipeline {
    /// Wire the pipeline with injected adapters. Fails fast on a malformed
    /// ontology or configuration, before any chunk is touched.
    pub fn with_adapters(
        config: RunConfig,
        ontology: Ontology,
        provider: Arc<dyn CompletionProvider>,
        tagger: Arc<dyn MentionTagger>,
        lookup: Arc<dyn CandidateLookup>,
    ) -> Result<Self, ConfigurationError> {
        ontology.validate()?;
        config.validate()?;

        let ontology = Arc::new(ontology);
        let retry = RetryPolicy::new(
            config.retry.max_retries,
            config.retry.initial_backoff_ms,
            config.retry.max_backoff_ms,
        );
        let filter = OntologyFilter::new(provider.clone(), &ontology, retry.clone());
        let resolver = EntityResolver::new(
            lookup,
            ontology.clone(),
            config.acceptance_threshold,
            retry.clone(),
            config.lookup_cache,
        );
        let relations = RelationExtractor::new(provider, ontology, retry.clone());

        Ok(Self {
            inner: Arc::new(PipelineInner {
                config,
                filter,
                resolver,
                relations,
                tagger,
                retry,
            }),
        })
    }

    /// Wire the pipeline with the configured real back-ends.
    pub fn from_config(config: RunConfig, ontology: Ontology) -> anyhow::Result<Self> {
        let provider =
            build_provider(&config.provider).context("failed to construct completion provider")?;
        let tagger = Arc::new(HttpTagger::new(
            config.tagger.endpoint.clone(),
            Duration::from_secs(config.tagger.timeout_secs),
        ));
        let lookup = Arc::new(WikidataLookup::new(
            config.lookup.endpoint.clone(),
            Duration::from_secs(config.lookup.timeout_secs),
            Duration::from_millis(config.lookup.courtesy_delay_ms),
        ));
        Self::with_adapters(config, ontology, provider, tagger, lookup)
            .context("invalid run configuration")
    }

    pub async fn run(&self, chunks: Vec<TextChunk>) -> RunOutcome {
        let (_handle, cancel) = CancelHandle::new();
        self.run_with_cancel(chunks, cancel).await
    }

    pub async fn run_with_cancel(
        &self,
        chunks: Vec<TextChunk>,
        cancel: watch::Receiver<bool>,
    ) -> RunOutcome {
        let start = Instant::now();
        let mut report = RunReport::new(chunks.len());
        let semaphore = Arc::new(Semaphore::new(self.inner.config.max_concurrent_chunks.max(1)));

        let mut tasks = JoinSet::new();
        for chunk in chunks {
            let inner = self.inner.clone();
            let semaphore = semaphore.clone();
            let cancel = cancel.clone();
            tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return ChunkResult {
                            doc_id: chunk.doc_id.clone(),
                            chunk_id: chunk.chunk_id.clone(),
                            outcome: ChunkOutcome::Cancelled,
                            linking: Duration::ZERO,
                        };
                    }
                };
                inner.process_chunk(chunk, cancel).await
            });
        }

        // Single writer over the in-progress graph: merges are serialized here.
        let mut assembler = GraphAssembler::new();
        while let Some(joined) = tasks.join_next().await {
            let result = match joined {
                Ok(result) => result,
                Err(e) => {
                    error!(error = %e, "chunk task aborted");
                    continue;
                }
            };
            report.linking_ms += result.linking.as_millis() as u64;
            match result.outcome {
                ChunkOutcome::FilteredOut => report.filtered_out.push(result.chunk_id),
                ChunkOutcome::Extracted {
                    extraction,
                    undecided,
                    discarded,
                } => {
                    if undecided {
                        report.undecided.push(result.chunk_id);
                    }
                    report.discarded_triples += discarded;
                    assembler.merge_chunk(&extraction);
                    report.chunks_merged += 1;
                }
                ChunkOutcome::Failed { stage, reason } => report.failures.push(ChunkFailure {
                    doc_id: result.doc_id,
                    chunk_id: result.chunk_id,
                    stage,
                    reason,
                }),
                ChunkOutcome::Cancelled => report.cancelled.push(result.chunk_id),
            }
        }

        report.elapsed_ms = start.elapsed().as_millis() as u64;
        report.finalize();
        info!(
            run_id = %report.run_id,
            chunks_total = report.chunks_total,
            chunks_merged = report.chunks_merged,
            failures = report.failures.len(),
            elapsed_ms = report.elapsed_ms,
            "run finished"
        );

        RunOutcome {
            graph: assembler.finish(),
            report,
        }
    }
}

impl PipelineInner {
    async fn process_chunk(
        &self,
        chunk: TextChunk,
        mut cancel: watch::Receiver<bool>,
    ) -> ChunkResult {
        let doc_id = chunk.doc_id.clone();
        let chunk_id = chunk.chunk_id.clone();

        if *cancel.borrow() {
            return ChunkResult {
                doc_id,
                chunk_id,
                outcome: ChunkOutcome::Cancelled,
                linking: Duration::ZERO,
            };
        }

        let (outcome, linking) = tokio::select! {
            biased;
            _ = wait_cancelled(&mut cancel) => (ChunkOutcome::Cancelled, Duration::ZERO),
            result = self.stages(&chunk) => result,
        };

        ChunkResult {
            doc_id,
            chunk_id,
            outcome,
            linking,
        }
    }

    /// filter → tag → resolve → relations for one chunk.
    async fn stages(&self, chunk: &TextChunk) -> (ChunkOutcome, Duration) {
        let filter_outcome = self.filter.classify(chunk).await;
        let undecided = match filter_outcome.decision {
            FilterDecision::Irrelevant => return (ChunkOutcome::FilteredOut, Duration::ZERO),
            FilterDecision::Undecided => true,
            FilterDecision::Relevant => false,
        };

        let spans = match self
            .retry
            .run("mention-tagging", || self.tagger.tag(&chunk.text))
            .await
        {
            Ok(spans) => spans,
            Err(e) => {
                return (
                    ChunkOutcome::Failed {
                        stage: Stage::Tag,
                        reason: e.to_string(),
                    },
                    Duration::ZERO,
                );
            }
        };

        let mut mentions = Vec::with_capacity(spans.len());
        for span in spans {
            match Mention::from_span(chunk, span) {
                Ok(mention) => mentions.push(mention),
                // Invariant violations are recovered locally.
                Err(e) => warn!(chunk_id = %chunk.chunk_id, error = %e, "discarding span"),
            }
        }

        // No mentions is a legitimate outcome, not an error.
        if mentions.is_empty() {
            return (
                ChunkOutcome::Extracted {
                    extraction: ChunkExtraction {
                        doc_id: chunk.doc_id.clone(),
                        chunk_id: chunk.chunk_id.clone(),
                        entities: Vec::new(),
                        relations: Vec::new(),
                    },
                    undecided,
                    discarded: 0,
                },
                Duration::ZERO,
            );
        }

        let linking_start = Instant::now();
        let entities = match self.resolver.resolve_chunk(chunk, mentions).await {
            Ok(entities) => entities,
            Err(e) => {
                return (
                    ChunkOutcome::Failed {
                        stage: Stage::Resolve,
                        reason: e.to_string(),
                    },
                    linking_start.elapsed(),
                );
            }
        };
        let linking = linking_start.elapsed();

        let relation_outcome = match self.relations.extract(chunk, &entities).await {
            Ok(outcome) => outcome,
            Err(e) => {
                return (
                    ChunkOutcome::Failed {
                        stage: Stage::Relations,
                        reason: e.to_string(),
                    },
                    linking,
                );
            }
        };

        (
            ChunkOutcome::Extracted {
                extraction: ChunkExtraction {
                    doc_id: chunk.doc_id.clone(),
                    chunk_id: chunk.chunk_id.clone(),
                    entities,
                    relations: relation_outcome.relations,
                },
                undecided,
                discarded: relation_outcome.discarded,
            },
            linking,
        )
    }
}

async fn wait_cancelled(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        if cancel.changed().await.is_err() {
            // Sender dropped without cancelling: never resolves.
            std::future::pending::<()>().await;
        }
    }
}
