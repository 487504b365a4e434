use crate::config::llm_provider::LlmProvider;

/// Configuration for one embedding model invocation.
///
/// # Fields
///
/// - `provider`: which backend serves the model.
/// - `model`: model identifier (e.g. `"nomic-embed-text"`, `"text-embedding-3-small"`).
/// - `endpoint`: base URL of the inference server, without the API path.
/// - `api_key`: bearer token for providers that require authentication.
/// - `timeout_secs`: per-request timeout; `None` means 60 seconds.
///
/// # Examples
///
/// ```
/// use ai_llm_service::{LlmModelConfig, LlmProvider};
///
/// let cfg = LlmModelConfig {
///     provider: LlmProvider::Ollama,
///     model: "nomic-embed-text".to_string(),
///     endpoint: "http://localhost:11434".to_string(),
///     api_key: None,
///     timeout_secs: Some(30),
/// };
/// assert_eq!(cfg.timeout().as_secs(), 30);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmModelConfig {
    pub provider: LlmProvider,
    pub model: String,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl LlmModelConfig {
    /// Effective request timeout.
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs.unwrap_or(60))
    }

    /// Endpoint without trailing slashes, ready for path concatenation.
    pub fn base_url(&self) -> &str {
        self.endpoint.trim().trim_end_matches('/')
    }
}
