use std::sync::Arc;

use adapters::{CompletionProvider, ProviderError, RetryPolicy};
use ontology::Ontology;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::prompt;
use crate::schema::TextChunk;

/// Relevance decision for one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterDecision {
    Relevant,
    Irrelevant,
    /// The provider could not be reached or answered garbage after retries.
    /// Undecided chunks pass through to later stages, never dropped.
    Undecided,
}

#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub decision: FilterDecision,
    pub rationale: Option<String>,
}

#[derive(Deserialize)]
struct FilterReply {
    relevant: bool,
    #[serde(default)]
    rationale: Option<String>,
}

/// Ontology-constrained relevance filter: one completion request per chunk.
pub struct OntologyFilter {
    provider: Arc<dyn CompletionProvider>,
    retry: RetryPolicy,
    system_prompt: String,
}

impl OntologyFilter {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        ontology: &Ontology,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            provider,
            retry,
            system_prompt: prompt::filter_system_prompt(ontology),
        }
    }

    /// Never fails: after exhausting retries the chunk is marked undecided.
    pub async fn classify(&self, chunk: &TextChunk) -> FilterOutcome {
        let attempt = || async {
            let raw = self
                .provider
                .complete(&self.system_prompt, &chunk.text, true)
                .await?;
            let reply: FilterReply = serde_json::from_str(&raw)
                .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
            Ok::<FilterReply, ProviderError>(reply)
        };

        match self.retry.run("ontology-filter", attempt).await {
            Ok(reply) => {
                let decision = if reply.relevant {
                    FilterDecision::Relevant
                } else {
                    FilterDecision::Irrelevant
                };
                debug!(chunk_id = %chunk.chunk_id, ?decision, "filter decision");
                FilterOutcome {
                    decision,
                    rationale: reply.rationale,
                }
            }
            Err(e) => {
                warn!(chunk_id = %chunk.chunk_id, error = %e, "filter undecided, passing chunk through");
                FilterOutcome {
                    decision: FilterDecision::Undecided,
                    rationale: Some(e.to_string()),
                }
            }
        }
    }
}
