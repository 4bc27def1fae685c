use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::providers::{ollama::OllamaProvider, openai::OpenAiProvider};

/// Uniform contract over interchangeable language-model back-ends.
///
/// The pipeline depends only on this trait; which back-end answers is decided
/// once at startup by [`build_provider`].
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Issue one completion request. When `json_mode` is set the back-end is
    /// asked to emit a single JSON object.
    async fn complete(
        &self,
        system_prompt: &str,
        user_content: &str,
        json_mode: bool,
    ) -> Result<String, ProviderError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Ollama,
    OpenAi,
}

/// Back-end selection, fixed for the duration of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub model: String,
    /// Overrides the back-end's default endpoint.
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::Ollama,
            model: "mistral:latest".to_string(),
            base_url: None,
            api_key: None,
            timeout_secs: 60,
        }
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Construct the configured back-end behind the capability interface.
pub fn build_provider(config: &ProviderConfig) -> Result<Arc<dyn CompletionProvider>, ProviderError> {
    match config.kind {
        ProviderKind::Ollama => Ok(Arc::new(OllamaProvider::new(
            config
                .base_url
                .clone()
                .unwrap_or_else(|| "http://localhost:11434".to_string()),
            config.model.clone(),
            config.timeout(),
        ))),
        ProviderKind::OpenAi => {
            let api_key = config
                .api_key
                .clone()
                .ok_or_else(|| ProviderError::Auth("OpenAI API key is required".to_string()))?;
            Ok(Arc::new(OpenAiProvider::new(
                config
                    .base_url
                    .clone()
                    .unwrap_or_else(|| "https://api.openai.com".to_string()),
                config.model.clone(),
                api_key,
                config.timeout(),
            )))
        }
    }
}
