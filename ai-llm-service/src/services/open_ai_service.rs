//! OpenAI-compatible embeddings: `POST {endpoint}/v1/embeddings` with
//! `{ model, input }`, reading `data[0].embedding`.

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider};
use crate::error_handler::{AiLlmError, Provider, ProviderError, ProviderErrorKind};
use crate::services::http::{checked_base, post_json};

#[derive(Debug)]
pub struct OpenAiService {
    client: reqwest::Client,
    model: String,
    url_embeddings: String,
}

impl OpenAiService {
    /// Builds a client with bearer auth and the configured timeout.
    ///
    /// # Errors
    /// `InvalidProvider`, `MissingApiKey` or `InvalidEndpoint` for a config
    /// that does not describe an OpenAI endpoint.
    pub fn new(cfg: LlmModelConfig) -> Result<Self, AiLlmError> {
        let fail = |kind| AiLlmError::from(ProviderError::new(Provider::OpenAI, kind));

        if cfg.provider != LlmProvider::OpenAI {
            return Err(fail(ProviderErrorKind::InvalidProvider));
        }
        let Some(key) = cfg.api_key.as_deref() else {
            return Err(fail(ProviderErrorKind::MissingApiKey));
        };
        let base = checked_base(Provider::OpenAI, &cfg)?;

        let bearer = HeaderValue::from_str(&format!("Bearer {key}")).map_err(|_| {
            fail(ProviderErrorKind::Decode(
                "api key is not a valid header value".into(),
            ))
        })?;
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, bearer);

        let client = reqwest::Client::builder()
            .timeout(cfg.timeout())
            .default_headers(headers)
            .build()?;

        info!(model = %cfg.model, endpoint = %base, "openai embeddings client ready");
        Ok(Self {
            client,
            url_embeddings: format!("{base}/v1/embeddings"),
            model: cfg.model,
        })
    }

    #[instrument(skip_all, fields(model = %self.model, input_len = input.len()))]
    pub async fn embeddings(&self, input: &str) -> Result<Vec<f32>, AiLlmError> {
        let request = EmbeddingsRequest {
            model: &self.model,
            input,
        };
        let resp: EmbeddingsResponse = post_json(
            &self.client,
            Provider::OpenAI,
            &self.url_embeddings,
            &request,
            "`data[0].embedding`",
        )
        .await?;

        resp.data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| {
                ProviderError::new(
                    Provider::OpenAI,
                    ProviderErrorKind::Decode("response has no `data` items".into()),
                )
                .into()
            })
    }
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}
