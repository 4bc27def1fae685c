use thiserror::Error;

/// A stage produced output that violates the data-model invariants.
///
/// Always recovered locally: the offending span or triple is discarded with
/// a warning, never propagated.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("mention span {start}..{end} is outside chunk '{chunk_id}' (len {len})")]
    MentionOutOfBounds {
        chunk_id: String,
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("relation type '{0}' is not in the ontology vocabulary")]
    UnknownRelationType(String),

    #[error("triple endpoint '{0}' does not match any resolved entity in the chunk")]
    UnknownEntity(String),

    #[error("relation '{relation}' does not allow '{surface}' as its {endpoint}")]
    EndpointMismatch {
        relation: String,
        surface: String,
        endpoint: &'static str,
    },

    #[error("malformed triple: expected [subject, predicate, object], got {0} elements")]
    MalformedTriple(usize),
}
