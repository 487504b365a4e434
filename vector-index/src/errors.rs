//! Unified error types for the crate.

use thiserror::Error;

/// Top-level error for vector-index operations.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Invalid or unsupported configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Record vector length differs from the index dimension.
    #[error("vector size mismatch: got {got}, want {want}")]
    VectorSizeMismatch { got: usize, want: usize },

    /// Write targeted an index that does not exist.
    #[error("index not found: {0}")]
    IndexNotFound(String),

    /// Backing store errors (wrapped, e.g. Qdrant).
    #[error("store error: {0}")]
    Store(String),

    /// JSON conversion errors.
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, IndexError>;
