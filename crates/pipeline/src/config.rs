use adapters::ProviderConfig;
use ontology::ConfigurationError;
use serde::{Deserialize, Serialize};

/// Immutable run configuration, constructed once at pipeline start and passed
/// to every component by reference. There is no mutable process-wide state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub provider: ProviderConfig,
    pub tagger: TaggerConfig,
    pub lookup: LookupConfig,
    pub retry: RetryConfig,
    /// A candidate links only when its score strictly exceeds this value.
    pub acceptance_threshold: f64,
    pub max_concurrent_chunks: usize,
    /// Cache candidate lookups by normalized surface string.
    pub lookup_cache: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaggerConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
    pub courtesy_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            tagger: TaggerConfig {
                endpoint: "http://localhost:8089/tag".to_string(),
                timeout_secs: 60,
            },
            lookup: LookupConfig {
                endpoint: "https://www.wikidata.org/w/api.php".to_string(),
                timeout_secs: 30,
                courtesy_delay_ms: 100,
            },
            retry: RetryConfig {
                max_retries: 3,
                initial_backoff_ms: 1000,
                max_backoff_ms: 10000,
            },
            acceptance_threshold: 20.0,
            max_concurrent_chunks: 4,
            lookup_cache: true,
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !self.acceptance_threshold.is_finite() || self.acceptance_threshold < 0.0 {
            return Err(ConfigurationError::BadThreshold(self.acceptance_threshold));
        }
        Ok(())
    }
}
