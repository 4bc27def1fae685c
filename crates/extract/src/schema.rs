use adapters::TaggedSpan;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::ValidationError;

/// A contiguous span of source text. Immutable once produced by ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextChunk {
    pub doc_id: String,
    pub chunk_id: String,
    pub text: String,
}

impl TextChunk {
    /// Build a chunk with a stable content-derived identifier.
    pub fn new(doc_id: impl Into<String>, text: impl Into<String>) -> Self {
        let doc_id = doc_id.into();
        let text = text.into();
        let chunk_id = Self::generate_chunk_id(&doc_id, &text);
        Self { doc_id, chunk_id, text }
    }

    /// Build a chunk with an identifier assigned upstream.
    pub fn with_id(
        doc_id: impl Into<String>,
        chunk_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            doc_id: doc_id.into(),
            chunk_id: chunk_id.into(),
            text: text.into(),
        }
    }

    fn generate_chunk_id(doc_id: &str, text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(doc_id.as_bytes());
        hasher.update(text.as_bytes());
        let result = hasher.finalize();
        hex::encode(&result[..16])
    }
}

/// A tagged mention span inside one chunk. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mention {
    pub chunk_id: String,
    pub start: usize,
    pub end: usize,
    pub surface: String,
    pub coarse_type: String,
}

impl Mention {
    /// Validates the span against the chunk it claims to come from.
    pub fn from_span(chunk: &TextChunk, span: TaggedSpan) -> Result<Self, ValidationError> {
        if span.start >= span.end || span.end > chunk.text.len() {
            return Err(ValidationError::MentionOutOfBounds {
                chunk_id: chunk.chunk_id.clone(),
                start: span.start,
                end: span.end,
                len: chunk.text.len(),
            });
        }
        Ok(Self {
            chunk_id: chunk.chunk_id.clone(),
            start: span.start,
            end: span.end,
            surface: span.surface,
            coarse_type: span.coarse_type,
        })
    }
}

/// A mention bound to a knowledge-base identifier, or explicitly unresolved.
///
/// Re-resolution creates a new value; an assigned `kb_id` is never rewritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedEntity {
    pub mention: Mention,
    pub kb_id: Option<String>,
    /// The knowledge-base label when linked, the surface string otherwise.
    pub canonical_label: String,
    pub kb_type: Option<String>,
    pub score: Option<f64>,
}

impl ResolvedEntity {
    pub fn linked(mention: Mention, kb_id: String, label: String, kb_type: String, score: f64) -> Self {
        Self {
            mention,
            kb_id: Some(kb_id),
            canonical_label: label,
            kb_type: Some(kb_type),
            score: Some(score),
        }
    }

    pub fn unresolved(mention: Mention) -> Self {
        let canonical_label = mention.surface.clone();
        Self {
            mention,
            kb_id: None,
            canonical_label,
            kb_type: None,
            score: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.kb_id.is_some()
    }
}

/// A typed relation between two entities resolved from the same chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationCandidate {
    pub chunk_id: String,
    pub subject: ResolvedEntity,
    pub relation: String,
    pub object: ResolvedEntity,
    pub confidence: f64,
}

/// Everything one chunk contributed, handed to the graph assembler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkExtraction {
    pub doc_id: String,
    pub chunk_id: String,
    pub entities: Vec<ResolvedEntity>,
    pub relations: Vec<RelationCandidate>,
}
