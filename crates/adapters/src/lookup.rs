use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::LookupError;

/// One ranked disambiguation candidate from the knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub kb_id: String,
    pub label: String,
    /// Coarse knowledge-base type derived from the candidate's description:
    /// "organization", "location", "person", "product" or "unknown".
    pub kb_type: String,
    pub score: f64,
}

/// The external entity-search service, consumed as a black box.
#[async_trait]
pub trait CandidateLookup: Send + Sync {
    /// Returns candidates ranked best-first. `context` may carry surrounding
    /// chunk text for disambiguation; implementations are free to ignore it.
    async fn lookup(
        &self,
        surface: &str,
        context: Option<&str>,
    ) -> Result<Vec<Candidate>, LookupError>;
}

/// Wikidata `wbsearchentities` client with keyword-based candidate scoring.
#[derive(Clone)]
pub struct WikidataLookup {
    endpoint: String,
    timeout: Duration,
    /// Pause after each request so we stay polite to the public API.
    courtesy_delay: Duration,
    limit: usize,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

const IN_DOMAIN_KEYWORDS: &[&str] = &[
    "company",
    "manufacturer",
    "brand",
    "supplier",
    "city",
    "country",
];
const OFF_DOMAIN_KEYWORDS: &[&str] = &["person", "album", "genus"];

/// Ranking signal for one search hit: exact label or alias matches dominate,
/// substring matches count half, and the description nudges the score toward
/// or away from the supply-chain domain.
pub fn score_hit(surface: &str, hit: &SearchHit) -> f64 {
    let surface_lower = surface.to_lowercase();
    let label_lower = hit.label.to_lowercase();
    let description = hit.description.to_lowercase();

    let mut score = 0.0;
    if label_lower == surface_lower
        || hit.aliases.iter().any(|a| a.to_lowercase() == surface_lower)
    {
        score += 100.0;
    } else if label_lower.contains(&surface_lower) {
        score += 50.0;
    }
    if IN_DOMAIN_KEYWORDS.iter().any(|kw| description.contains(kw)) {
        score += 20.0;
    }
    if OFF_DOMAIN_KEYWORDS.iter().any(|kw| description.contains(kw)) {
        score -= 50.0;
    }
    score
}

/// Coarse knowledge-base type read off the description text.
pub fn kb_type_of(hit: &SearchHit) -> &'static str {
    let description = hit.description.to_lowercase();
    let has = |kws: &[&str]| kws.iter().any(|kw| description.contains(kw));

    if has(&["company", "manufacturer", "brand", "supplier", "corporation", "enterprise"]) {
        "organization"
    } else if has(&["city", "country", "region", "town", "state", "capital"]) {
        "location"
    } else if has(&["person", "politician", "actor", "businessman"]) {
        "person"
    } else if has(&["product", "vehicle", "device", "component"]) {
        "product"
    } else {
        "unknown"
    }
}

impl WikidataLookup {
    pub fn new(endpoint: String, timeout: Duration, courtesy_delay: Duration) -> Self {
        Self {
            endpoint,
            timeout,
            courtesy_delay,
            limit: 5,
            client: reqwest::Client::new(),
        }
    }

    pub fn public() -> Self {
        Self::new(
            "https://www.wikidata.org/w/api.php".to_string(),
            Duration::from_secs(30),
            Duration::from_millis(100),
        )
    }
}

#[async_trait]
impl CandidateLookup for WikidataLookup {
    async fn lookup(
        &self,
        surface: &str,
        _context: Option<&str>,
    ) -> Result<Vec<Candidate>, LookupError> {
        let limit = self.limit.to_string();
        let send = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("action", "wbsearchentities"),
                ("format", "json"),
                ("language", "en"),
                ("search", surface),
                ("limit", limit.as_str()),
            ])
            .send();
        let response = tokio::time::timeout(self.timeout, send)
            .await
            .map_err(|_| LookupError::Timeout(self.timeout))?
            .map_err(|e| LookupError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LookupError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let search: SearchResponse = response
            .json()
            .await
            .map_err(|e| LookupError::InvalidResponse(e.to_string()))?;

        if !self.courtesy_delay.is_zero() {
            tokio::time::sleep(self.courtesy_delay).await;
        }

        let mut candidates: Vec<Candidate> = search
            .search
            .iter()
            .map(|hit| Candidate {
                kb_id: hit.id.clone(),
                label: hit.label.clone(),
                kb_type: kb_type_of(hit).to_string(),
                score: score_hit(surface, hit),
            })
            .collect();
        // Rank best-first; tie on id for a deterministic order.
        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.kb_id.cmp(&b.kb_id))
        });

        debug!(surface, candidates = candidates.len(), "candidate lookup");
        Ok(candidates)
    }
}
