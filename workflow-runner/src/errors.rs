use thiserror::Error;

/// Errors crossing the workflow-engine boundary.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The engine refused to start an execution (unknown workflow, bad name,
    /// duplicate name, malformed input).
    #[error("execution start rejected: {0}")]
    ExecutionStart(String),

    #[error("execution does not exist: {0}")]
    ExecutionNotFound(String),

    /// Status query failed.
    #[error("status query failed: {0}")]
    Poll(String),
}

pub type Result<T> = std::result::Result<T, WorkflowError>;
