//! Command configuration resolved from environment variables.
//!
//! | variable | default |
//! |----------|---------|
//! | `WORKFLOW_ARN` | required |
//! | `S3_BUCKET` | required |
//! | `STORAGE_ROOT` | `.` |
//! | `VECTOR_STORE` | `qdrant` (`memory` for local runs) |
//! | `QDRANT_URL` | `http://localhost:6334` |
//! | `QDRANT_API_KEY` | unset |
//! | `VECTOR_DIM` | `1536` |
//! | `UPSERT_CONCURRENCY` | `8` |
//! | `EMBEDDING_CONCURRENCY` | `1` |
//! | `POLL_INTERVAL_SECS` | `30` |
//! | `POLL_TIMEOUT_MINUTES` | `30` |
//! | `EXECUTION_TIMEOUT_SECS` | unset |
//!
//! Embedding model variables are documented in
//! [`ai_llm_service::config::default_config`].

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use ai_llm_service::LlmModelConfig;
use ai_llm_service::config::default_config::config_embedding_from_lookup;
use ai_llm_service::error_handler::opt_var;
use thiserror::Error;
use vector_index::{IndexConfig, StoreKind};
use workflow_runner::PollPolicy;

/// Loads `.env` from the working directory or one of its parents.
///
/// A missing file yields `Ok(None)`; a file that exists but cannot be read or
/// parsed is returned as the error.
pub fn load_dotenv() -> Result<Option<PathBuf>, dotenvy::Error> {
    optional_dotenv(dotenvy::dotenv())
}

fn optional_dotenv(
    loaded: Result<PathBuf, dotenvy::Error>,
) -> Result<Option<PathBuf>, dotenvy::Error> {
    match loaded {
        Ok(path) => Ok(Some(path)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Fatal errors of the trigger command. None of them leaves an execution behind.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("discovery error: {0}")]
    Discovery(String),

    #[error("execution start error: {0}")]
    ExecutionStart(String),
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub workflow_arn: String,
    pub bucket: String,
    pub storage_root: PathBuf,
    pub index: IndexConfig,
    pub embedding: LlmModelConfig,
    pub embedding_concurrency: usize,
    pub poll: PollPolicy,
    pub execution_timeout: Option<Duration>,
}

fn required<F>(lookup: &F, name: &str) -> Result<String, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    opt_var(lookup, name)
        .ok_or_else(|| AppError::Configuration(format!("{name} environment variable is required")))
}

fn number<F, T>(lookup: &F, name: &str, default: T) -> Result<T, AppError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match opt_var(lookup, name) {
        Some(v) => v
            .parse()
            .map_err(|_| AppError::Configuration(format!("{name} is not a valid number: {v:?}"))),
        None => Ok(default),
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let workflow_arn = required(&lookup, "WORKFLOW_ARN")?;
        let bucket = required(&lookup, "S3_BUCKET")?;

        let store = match opt_var(&lookup, "VECTOR_STORE").as_deref() {
            None | Some("qdrant") => StoreKind::Qdrant,
            Some("memory") => StoreKind::Memory,
            Some(other) => {
                return Err(AppError::Configuration(format!(
                    "VECTOR_STORE must be `qdrant` or `memory`, got {other:?}"
                )));
            }
        };
        let mut index = IndexConfig::new_default(
            opt_var(&lookup, "QDRANT_URL").unwrap_or_else(|| "http://localhost:6334".into()),
        );
        index.store = store;
        index.qdrant_api_key = opt_var(&lookup, "QDRANT_API_KEY");
        index.dimension = number(&lookup, "VECTOR_DIM", index.dimension)?;
        index.upsert_concurrency = number(&lookup, "UPSERT_CONCURRENCY", index.upsert_concurrency)?;
        index
            .validate()
            .map_err(|e| AppError::Configuration(e.to_string()))?;

        let embedding = config_embedding_from_lookup(&lookup)
            .map_err(|e| AppError::Configuration(e.to_string()))?;

        let embedding_concurrency: usize = number(&lookup, "EMBEDDING_CONCURRENCY", 1)?;
        if embedding_concurrency == 0 {
            return Err(AppError::Configuration(
                "EMBEDDING_CONCURRENCY must be > 0".into(),
            ));
        }

        let interval_secs: u64 = number(&lookup, "POLL_INTERVAL_SECS", 30)?;
        if interval_secs == 0 {
            return Err(AppError::Configuration(
                "POLL_INTERVAL_SECS must be > 0".into(),
            ));
        }
        let timeout_secs = number::<_, u64>(&lookup, "POLL_TIMEOUT_MINUTES", 30)?
            .checked_mul(60)
            .ok_or_else(|| {
                AppError::Configuration("POLL_TIMEOUT_MINUTES is out of range".into())
            })?;
        let poll = PollPolicy {
            interval: Duration::from_secs(interval_secs),
            timeout: Duration::from_secs(timeout_secs),
        };
        let execution_timeout = match opt_var(&lookup, "EXECUTION_TIMEOUT_SECS") {
            Some(_) => Some(Duration::from_secs(number(&lookup, "EXECUTION_TIMEOUT_SECS", 0)?)),
            None => None,
        };

        Ok(Self {
            workflow_arn,
            bucket,
            storage_root: PathBuf::from(
                opt_var(&lookup, "STORAGE_ROOT").unwrap_or_else(|| ".".into()),
            ),
            index,
            embedding,
            embedding_concurrency,
            poll,
            execution_timeout,
        })
    }
}
