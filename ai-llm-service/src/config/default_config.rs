//! Embedding model config resolved strictly from environment variables.
//!
//! # Environment variables
//!
//! Common:
//! - `LLM_KIND` = provider kind (`ollama` default, or `openai`)
//! - `EMBEDDING_MODEL` = embedding model (mandatory)
//! - `EMBEDDING_TIMEOUT_SECS` = optional request timeout (u64, default 30)
//!
//! Ollama-specific:
//! - `OLLAMA_URL` or `OLLAMA_PORT` = endpoint (mandatory)
//!
//! OpenAI-specific:
//! - `OPENAI_URL` = endpoint (default `https://api.openai.com`)
//! - `OPENAI_API_KEY` = bearer token (mandatory)

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{
        AiLlmError, ConfigError, must_var, opt_u64, opt_var, validate_http_endpoint,
    },
};

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Resolves the embedding config from the process environment.
pub fn config_embedding_from_env() -> Result<LlmModelConfig, AiLlmError> {
    config_embedding_from_lookup(|k| std::env::var(k).ok())
}

/// Resolves the embedding config from an arbitrary variable source.
///
/// # Errors
///
/// - [`ConfigError::MissingVar`] for a missing model/endpoint/key
/// - [`ConfigError::UnsupportedProvider`] for an unknown `LLM_KIND`
/// - [`ConfigError::InvalidNumber`] / [`ConfigError::InvalidFormat`] for malformed values
pub fn config_embedding_from_lookup<F>(lookup: F) -> Result<LlmModelConfig, AiLlmError>
where
    F: Fn(&str) -> Option<String>,
{
    let provider = match opt_var(&lookup, "LLM_KIND") {
        Some(kind) => kind.parse::<LlmProvider>()?,
        None => LlmProvider::Ollama,
    };
    let model = must_var(&lookup, "EMBEDDING_MODEL")?;
    let timeout_secs = opt_u64(&lookup, "EMBEDDING_TIMEOUT_SECS")?.unwrap_or(DEFAULT_TIMEOUT_SECS);

    let (endpoint, api_key) = match provider {
        LlmProvider::Ollama => (ollama_endpoint(&lookup)?, None),
        LlmProvider::OpenAI => {
            let endpoint =
                opt_var(&lookup, "OPENAI_URL").unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string());
            validate_http_endpoint("OPENAI_URL", &endpoint)?;
            (endpoint, Some(must_var(&lookup, "OPENAI_API_KEY")?))
        }
    };

    Ok(LlmModelConfig {
        provider,
        model,
        endpoint,
        api_key,
        timeout_secs: Some(timeout_secs),
    })
}

/// Resolves the Ollama endpoint.
///
/// Precedence:
/// 1. `OLLAMA_URL` if present and non-empty
/// 2. `OLLAMA_PORT` → `http://localhost:{port}`
fn ollama_endpoint<F>(lookup: &F) -> Result<String, AiLlmError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = opt_var(lookup, "OLLAMA_URL") {
        validate_http_endpoint("OLLAMA_URL", &url)?;
        return Ok(url);
    }
    if let Some(port) = opt_var(lookup, "OLLAMA_PORT") {
        port.parse::<u16>().map_err(|_| ConfigError::InvalidNumber {
            var: "OLLAMA_PORT",
            reason: "expected u16 (1..=65535)",
        })?;
        return Ok(format!("http://localhost:{port}"));
    }
    Err(ConfigError::MissingVar("OLLAMA_URL or OLLAMA_PORT").into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn ollama_from_port() {
        let cfg = config_embedding_from_lookup(env(&[
            ("EMBEDDING_MODEL", "nomic-embed-text"),
            ("OLLAMA_PORT", "11434"),
        ]))
        .unwrap();
        assert_eq!(cfg.provider, LlmProvider::Ollama);
        assert_eq!(cfg.endpoint, "http://localhost:11434");
        assert_eq!(cfg.timeout_secs, Some(30));
    }

    #[test]
    fn openai_requires_key() {
        let err = config_embedding_from_lookup(env(&[
            ("LLM_KIND", "openai"),
            ("EMBEDDING_MODEL", "text-embedding-3-small"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            AiLlmError::Config(ConfigError::MissingVar("OPENAI_API_KEY"))
        ));
    }

    #[test]
    fn rejects_bad_port() {
        let err = config_embedding_from_lookup(env(&[
            ("EMBEDDING_MODEL", "m"),
            ("OLLAMA_PORT", "99999"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            AiLlmError::Config(ConfigError::InvalidNumber { var: "OLLAMA_PORT", .. })
        ));
    }
}
