use serde::Serialize;
use uuid::Uuid;

/// The pipeline stage at which a chunk failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Filter,
    Tag,
    Resolve,
    Relations,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChunkFailure {
    pub doc_id: String,
    pub chunk_id: String,
    pub stage: Stage,
    pub reason: String,
}

/// Structured partial-failure report returned alongside the graph, so callers
/// can distinguish "empty because nothing was there" from "empty because
/// everything failed".
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub chunks_total: usize,
    /// Chunks whose output reached the graph assembler.
    pub chunks_merged: usize,
    /// Chunks the ontology filter judged irrelevant.
    pub filtered_out: Vec<String>,
    /// Chunks whose relevance could not be decided; they were still processed.
    pub undecided: Vec<String>,
    /// Chunks skipped because the run was cancelled.
    pub cancelled: Vec<String>,
    pub failures: Vec<ChunkFailure>,
    /// Provider-proposed triples rejected by validation.
    pub discarded_triples: usize,
    pub elapsed_ms: u64,
    /// Time spent in candidate lookup, summed across chunks.
    pub linking_ms: u64,
}

impl RunReport {
    pub fn new(chunks_total: usize) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            chunks_total,
            chunks_merged: 0,
            filtered_out: Vec::new(),
            undecided: Vec::new(),
            cancelled: Vec::new(),
            failures: Vec::new(),
            discarded_triples: 0,
            elapsed_ms: 0,
            linking_ms: 0,
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Deterministic ordering regardless of chunk completion order.
    pub(crate) fn finalize(&mut self) {
        self.filtered_out.sort();
        self.undecided.sort();
        self.cancelled.sort();
        self.failures
            .sort_by(|a, b| a.chunk_id.cmp(&b.chunk_id).then_with(|| a.stage.cmp_key().cmp(&b.stage.cmp_key())));
    }
}

impl Stage {
    fn cmp_key(self) -> u8 {
        match self {
            Stage::Filter => 0,
            Stage::Tag => 1,
            Stage::Resolve => 2,
            Stage::Relations => 3,
        }
    }
}
