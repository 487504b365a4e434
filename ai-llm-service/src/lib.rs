//! Embedding inference clients used by the ingestion pipeline.
//!
//! The crate exposes one entry point, [`EmbeddingService`], built from an
//! [`LlmModelConfig`] (usually resolved from the environment via
//! [`config::default_config::config_embedding_from_env`]). Provider specific
//! clients live under [`services`].

pub mod config;
pub mod embedding_service;
pub mod error_handler;
pub mod services;
pub mod telemetry;

pub use config::llm_model_config::LlmModelConfig;
pub use config::llm_provider::LlmProvider;
pub use embedding_service::EmbeddingService;
pub use error_handler::{AiLlmError, ConfigError, Result};
