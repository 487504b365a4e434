//! Request plumbing shared by the provider clients.

use std::time::Instant;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use crate::config::llm_model_config::LlmModelConfig;
use crate::error_handler::{
    AiLlmError, HttpError, Provider, ProviderError, ProviderErrorKind, make_snippet,
};

/// Base URL of `cfg`, or `InvalidEndpoint` if it lacks an http(s) scheme.
pub(crate) fn checked_base(
    provider: Provider,
    cfg: &LlmModelConfig,
) -> Result<String, AiLlmError> {
    let base = cfg.base_url();
    if base.starts_with("http://") || base.starts_with("https://") {
        return Ok(base.to_string());
    }
    let kind = ProviderErrorKind::InvalidEndpoint(cfg.endpoint.clone());
    Err(ProviderError::new(provider, kind).into())
}

/// POSTs `body` as JSON and decodes a 2xx response into `R`.
///
/// Non-2xx becomes `HttpStatus` with a body snippet; an undecodable body
/// becomes `Decode` mentioning `expected`.
pub(crate) async fn post_json<B, R>(
    client: &reqwest::Client,
    provider: Provider,
    url: &str,
    body: &B,
    expected: &str,
) -> Result<R, AiLlmError>
where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let started = Instant::now();
    debug!(%provider, "POST {url}");
    let resp = client.post(url).json(body).send().await?;

    let status = resp.status();
    if !status.is_success() {
        let snippet = make_snippet(&resp.text().await.unwrap_or_default());
        error!(
            %provider,
            %status,
            url,
            %snippet,
            latency_ms = started.elapsed().as_millis(),
            "embedding request rejected"
        );
        return Err(ProviderError::new(
            provider,
            ProviderErrorKind::HttpStatus(HttpError {
                status,
                url: url.to_string(),
                snippet,
            }),
        )
        .into());
    }

    let decoded = resp.json::<R>().await.map_err(|e| {
        ProviderError::new(
            provider,
            ProviderErrorKind::Decode(format!("{e}; expected {expected}")),
        )
    })?;
    debug!(%provider, latency_ms = started.elapsed().as_millis(), "response decoded");
    Ok(decoded)
}
