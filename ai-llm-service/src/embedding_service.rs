//! Provider-agnostic embedding client.
//!
//! Construct once from an [`LlmModelConfig`], wrap in `Arc` and share. The
//! variant is chosen by `cfg.provider`.

use tracing::debug;

use crate::config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider};
use crate::error_handler::AiLlmError;
use crate::services::{ollama_service::OllamaService, open_ai_service::OpenAiService};

/// Embedding client dispatching to the configured provider.
#[derive(Debug)]
pub enum EmbeddingService {
    Ollama(OllamaService),
    OpenAi(OpenAiService),
}

impl EmbeddingService {
    /// Builds the provider client for `cfg`.
    ///
    /// # Errors
    /// Propagates provider constructor validation errors.
    pub fn new(cfg: LlmModelConfig) -> Result<Self, AiLlmError> {
        debug!(provider = ?cfg.provider, model = %cfg.model, "building embedding service");
        match cfg.provider {
            LlmProvider::Ollama => Ok(Self::Ollama(OllamaService::new(cfg)?)),
            LlmProvider::OpenAI => Ok(Self::OpenAi(OpenAiService::new(cfg)?)),
        }
    }

    /// Computes one embedding vector for `input`.
    pub async fn embed(&self, input: &str) -> Result<Vec<f32>, AiLlmError> {
        match self {
            Self::Ollama(cli) => cli.embeddings(input).await,
            Self::OpenAi(cli) => cli.embeddings(input).await,
        }
    }
}
