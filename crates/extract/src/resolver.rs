use std::sync::Arc;

use adapters::{Candidate, CandidateLookup, LookupError, RetryPolicy};
use dashmap::DashMap;
use ontology::Ontology;
use tracing::debug;

use crate::normalize::normalize_surface;
use crate::schema::{Mention, ResolvedEntity, TextChunk};

/// Binds each mention to zero or one knowledge-base identifier.
///
/// The top-ranked candidate is accepted only when its score strictly exceeds
/// the acceptance threshold and its knowledge-base type is compatible with
/// the mention's coarse type; everything else resolves to "unresolved".
/// Ties at the boundary resolve unresolved, biasing against false links.
pub struct EntityResolver {
    lookup: Arc<dyn CandidateLookup>,
    ontology: Arc<Ontology>,
    threshold: f64,
    retry: RetryPolicy,
    /// Request cache keyed by normalized surface. Purely a throughput
    /// optimization; observable results are unchanged.
    cache: Option<DashMap<String, Vec<Candidate>>>,
}

impl EntityResolver {
    pub fn new(
        lookup: Arc<dyn CandidateLookup>,
        ontology: Arc<Ontology>,
        threshold: f64,
        retry: RetryPolicy,
        cache_enabled: bool,
    ) -> Self {
        Self {
            lookup,
            ontology,
            threshold,
            retry,
            cache: cache_enabled.then(DashMap::new),
        }
    }

    /// One ResolvedEntity per Mention, in mention order. A lookup failure
    /// that survives retries fails the whole chunk at this stage.
    pub async fn resolve_chunk(
        &self,
        chunk: &TextChunk,
        mentions: Vec<Mention>,
    ) -> Result<Vec<ResolvedEntity>, LookupError> {
        let mut resolved = Vec::with_capacity(mentions.len());
        for mention in mentions {
            let candidates = self.candidates_for(&mention.surface, chunk).await?;
            resolved.push(self.select(mention, &candidates));
        }
        Ok(resolved)
    }

    async fn candidates_for(
        &self,
        surface: &str,
        chunk: &TextChunk,
    ) -> Result<Vec<Candidate>, LookupError> {
        let key = normalize_surface(surface);
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(&key) {
                return Ok(hit.value().clone());
            }
        }

        let candidates = self
            .retry
            .run("candidate-lookup", || {
                self.lookup.lookup(surface, Some(&chunk.text))
            })
            .await?;

        if let Some(cache) = &self.cache {
            cache.insert(key, candidates.clone());
        }
        Ok(candidates)
    }

    fn select(&self, mention: Mention, candidates: &[Candidate]) -> ResolvedEntity {
        let top = candidates
            .iter()
            .max_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal));

        match top {
            Some(best)
                if best.score > self.threshold
                    && self
                        .ontology
                        .is_link_compatible(&mention.coarse_type, &best.kb_type) =>
            {
                debug!(
                    surface = %mention.surface,
                    kb_id = %best.kb_id,
                    score = best.score,
                    "mention linked"
                );
                ResolvedEntity::linked(
                    mention,
                    best.kb_id.clone(),
                    best.label.clone(),
                    best.kb_type.clone(),
                    best.score,
                )
            }
            _ => {
                debug!(surface = %mention.surface, "mention unresolved");
                ResolvedEntity::unresolved(mention)
            }
        }
    }
}
