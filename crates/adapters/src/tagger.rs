use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TaggerError;

/// A raw mention span as produced by the sequence-tagging model.
///
/// Offsets are byte positions into the tagged chunk text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaggedSpan {
    pub start: usize,
    pub end: usize,
    pub surface: String,
    pub coarse_type: String,
}

/// The externally supplied mention tagger, consumed as a black box.
#[async_trait]
pub trait MentionTagger: Send + Sync {
    /// Returns spans in document order for one chunk of text.
    async fn tag(&self, text: &str) -> Result<Vec<TaggedSpan>, TaggerError>;
}

/// Tagger served over HTTP (e.g. a small sidecar wrapping the NER model).
#[derive(Clone)]
pub struct HttpTagger {
    endpoint: String,
    timeout: Duration,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct TagRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct TagResponse {
    spans: Vec<TaggedSpan>,
}

impl HttpTagger {
    pub fn new(endpoint: String, timeout: Duration) -> Self {
        Self {
            endpoint,
            timeout,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl MentionTagger for HttpTagger {
    async fn tag(&self, text: &str) -> Result<Vec<TaggedSpan>, TaggerError> {
        let send = self
            .client
            .post(&self.endpoint)
            .json(&TagRequest { text })
            .send();
        let response = tokio::time::timeout(self.timeout, send)
            .await
            .map_err(|_| TaggerError::Timeout(self.timeout))?
            .map_err(|e| TaggerError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TaggerError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let tagged: TagResponse = response
            .json()
            .await
            .map_err(|e| TaggerError::InvalidResponse(e.to_string()))?;
        Ok(tagged.spans)
    }
}
