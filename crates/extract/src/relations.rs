use std::collections::HashMap;
use std::sync::Arc;

use adapters::{CompletionProvider, ProviderError, RetryPolicy};
use ontology::{Endpoint, Ontology};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::ValidationError;
use crate::normalize::normalize_surface;
use crate::prompt;
use crate::schema::{RelationCandidate, ResolvedEntity, TextChunk};

#[derive(Debug, Default)]
pub struct RelationOutcome {
    pub relations: Vec<RelationCandidate>,
    /// Triples the provider proposed but validation discarded.
    pub discarded: usize,
}

#[derive(Deserialize)]
struct RelationsReply {
    #[serde(default)]
    relations: Vec<serde_json::Value>,
}

/// Proposes typed relations between a chunk's resolved entities, one
/// completion request per chunk, and validates every returned triple against
/// the ontology and the chunk's entity set. Invalid triples are discarded
/// with a warning; a chunk producing zero valid triples is not an error.
pub struct RelationExtractor {
    provider: Arc<dyn CompletionProvider>,
    ontology: Arc<Ontology>,
    retry: RetryPolicy,
    system_prompt: String,
}

impl RelationExtractor {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        ontology: Arc<Ontology>,
        retry: RetryPolicy,
    ) -> Self {
        let system_prompt = prompt::relation_system_prompt(&ontology);
        Self {
            provider,
            ontology,
            retry,
            system_prompt,
        }
    }

    pub async fn extract(
        &self,
        chunk: &TextChunk,
        entities: &[ResolvedEntity],
    ) -> Result<RelationOutcome, ProviderError> {
        // A relation needs two distinct endpoints.
        if entities.len() < 2 {
            return Ok(RelationOutcome::default());
        }

        let user_content = prompt::relation_user_content(&chunk.text, entities);
        let reply = self
            .retry
            .run("relation-extraction", || async {
                let raw = self
                    .provider
                    .complete(&self.system_prompt, &user_content, true)
                    .await?;
                serde_json::from_str::<RelationsReply>(&raw)
                    .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
            })
            .await?;

        // Both surface form and canonical label identify an entity, the way
        // the provider may echo either back.
        let mut by_name: HashMap<String, &ResolvedEntity> = HashMap::new();
        for entity in entities {
            by_name.insert(normalize_surface(&entity.mention.surface), entity);
            by_name.insert(normalize_surface(&entity.canonical_label), entity);
        }

        let mut outcome = RelationOutcome::default();
        for value in reply.relations {
            match self.validate_triple(chunk, &by_name, &value) {
                Ok(relation) => outcome.relations.push(relation),
                Err(e) => {
                    warn!(chunk_id = %chunk.chunk_id, error = %e, "discarding triple");
                    outcome.discarded += 1;
                }
            }
        }
        debug!(
            chunk_id = %chunk.chunk_id,
            kept = outcome.relations.len(),
            discarded = outcome.discarded,
            "relation extraction"
        );
        Ok(outcome)
    }

    fn validate_triple(
        &self,
        chunk: &TextChunk,
        by_name: &HashMap<String, &ResolvedEntity>,
        value: &serde_json::Value,
    ) -> Result<RelationCandidate, ValidationError> {
        let parts: Vec<&str> = value
            .as_array()
            .map(|a| a.iter().filter_map(|v| v.as_str()).collect())
            .unwrap_or_default();
        if parts.len() != 3 {
            return Err(ValidationError::MalformedTriple(parts.len()));
        }
        let (subject_name, relation_name, object_name) = (parts[0], parts[1], parts[2]);

        let Some(schema) = self.ontology.relation(relation_name) else {
            return Err(ValidationError::UnknownRelationType(relation_name.to_string()));
        };
        let subject = by_name
            .get(&normalize_surface(subject_name))
            .copied()
            .ok_or_else(|| ValidationError::UnknownEntity(subject_name.to_string()))?;
        let object = by_name
            .get(&normalize_surface(object_name))
            .copied()
            .ok_or_else(|| ValidationError::UnknownEntity(object_name.to_string()))?;

        if !self.ontology.endpoint_allows(
            schema,
            Endpoint::Subject,
            Some(&subject.mention.coarse_type),
        ) {
            return Err(ValidationError::EndpointMismatch {
                relation: relation_name.to_string(),
                surface: subject_name.to_string(),
                endpoint: "subject",
            });
        }
        if !self
            .ontology
            .endpoint_allows(schema, Endpoint::Object, Some(&object.mention.coarse_type))
        {
            return Err(ValidationError::EndpointMismatch {
                relation: relation_name.to_string(),
                surface: object_name.to_string(),
                endpoint: "object",
            });
        }

        // Triples over linked entities carry more weight than ones whose
        // endpoints never matched the knowledge base.
        let confidence = if subject.is_resolved() && object.is_resolved() {
            1.0
        } else {
            0.7
        };

        Ok(RelationCandidate {
            chunk_id: chunk.chunk_id.clone(),
            subject: subject.clone(),
            relation: relation_name.to_string(),
            object: object.clone(),
            confidence,
        })
    }
}
