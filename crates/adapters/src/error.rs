use std::time::Duration;
use thiserror::Error;

/// Completion back-end unreachable or returned an unusable response.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("provider returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid response payload: {0}")]
    InvalidResponse(String),
}

/// Sequence-tagging model unavailable.
#[derive(Debug, Error)]
pub enum TaggerError {
    #[error("tagger unavailable: {0}")]
    Unavailable(String),

    #[error("tagger returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("tagging timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid tagger response: {0}")]
    InvalidResponse(String),
}

/// Candidate-search service unreachable.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("lookup request failed: {0}")]
    Request(String),

    #[error("lookup service returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("lookup timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid lookup response: {0}")]
    InvalidResponse(String),
}
