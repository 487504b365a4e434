use services::storage::StorageError;
use thiserror::Error;
use vector_index::IndexError;

/// File-level stage failures. Each one fails the whole stage invocation.
#[derive(Debug, Error)]
pub enum StageError {
    /// The input is not a rectangular CSV table.
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// The embedding call for `row` failed or returned a malformed vector.
    #[error("Embedding service error at row {row}: {message}")]
    EmbeddingService { row: usize, message: String },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Index(#[from] IndexError),

    /// Stage input did not have the expected shape.
    #[error("Invalid stage payload: {0}")]
    Payload(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StageError>;

/// Failure reported by an [`crate::EmbeddingsProvider`]; carries the upstream message.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct EmbedError(pub String);
