//! Ollama embeddings: `POST {endpoint}/api/embeddings` with `{ model, prompt }`,
//! answered by `{ embedding: number[] }`.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider};
use crate::error_handler::{AiLlmError, Provider, ProviderError, ProviderErrorKind};
use crate::services::http::{checked_base, post_json};

#[derive(Debug)]
pub struct OllamaService {
    client: reqwest::Client,
    model: String,
    url_embeddings: String,
}

impl OllamaService {
    /// # Errors
    /// `InvalidProvider` for a non-Ollama config, `InvalidEndpoint` for an
    /// endpoint without an http(s) scheme.
    pub fn new(cfg: LlmModelConfig) -> Result<Self, AiLlmError> {
        if cfg.provider != LlmProvider::Ollama {
            return Err(
                ProviderError::new(Provider::Ollama, ProviderErrorKind::InvalidProvider).into(),
            );
        }
        let base = checked_base(Provider::Ollama, &cfg)?;
        let client = reqwest::Client::builder().timeout(cfg.timeout()).build()?;

        debug!(model = %cfg.model, endpoint = %base, "ollama embeddings client ready");
        Ok(Self {
            client,
            url_embeddings: format!("{base}/api/embeddings"),
            model: cfg.model,
        })
    }

    #[instrument(skip_all, fields(model = %self.model, input_len = input.len()))]
    pub async fn embeddings(&self, input: &str) -> Result<Vec<f32>, AiLlmError> {
        let request = EmbeddingsRequest {
            model: &self.model,
            prompt: input,
        };
        let resp: EmbeddingsResponse = post_json(
            &self.client,
            Provider::Ollama,
            &self.url_embeddings,
            &request,
            "`{ embedding: number[] }`",
        )
        .await?;
        Ok(resp.embedding)
    }
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    embedding: Vec<f32>,
}
