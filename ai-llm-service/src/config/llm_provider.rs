use std::str::FromStr;

use crate::error_handler::ConfigError;

/// Backend used for embedding inference.
///
/// Parsed from `LLM_KIND` (`ollama` or `openai`, case-insensitive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LlmProvider {
    /// Local or self-hosted Ollama runtime.
    Ollama,
    /// OpenAI or any server exposing the OpenAI `/v1/embeddings` contract.
    OpenAI,
}

impl FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" | "chatgpt" => Ok(Self::OpenAI),
            other => Err(ConfigError::UnsupportedProvider(other.to_string())),
        }
    }
}
