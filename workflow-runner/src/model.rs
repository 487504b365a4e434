//! Execution data model shared by engines, stages and the orchestrator.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Input of one pipeline execution.
///
/// Wire form: `{"s3_bucket": .., "csv_file_path": .., "columns_to_embed": [..]}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    #[serde(rename = "s3_bucket")]
    pub bucket: String,
    #[serde(rename = "csv_file_path")]
    pub file_path: String,
    #[serde(rename = "columns_to_embed")]
    pub embed_columns: Vec<String>,
}

/// Identifies exactly one started execution.
#[derive(Clone, Debug)]
pub struct ExecutionHandle {
    pub execution_id: String,
    pub name: String,
    pub started_at: DateTime<Utc>,
    /// Monotonic start, the reference point for the poll timeout.
    pub(crate) started: tokio::time::Instant,
}

impl ExecutionHandle {
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Execution status as reported by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Running,
    Succeeded,
    Failed,
    TimedOut,
    Aborted,
}

impl ExecutionStatus {
    /// Every status except `RUNNING` is terminal.
    pub fn is_terminal(self) -> bool {
        !matches!(self, ExecutionStatus::Running)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExecutionStatus::Running => "RUNNING",
            ExecutionStatus::Succeeded => "SUCCEEDED",
            ExecutionStatus::Failed => "FAILED",
            ExecutionStatus::TimedOut => "TIMED_OUT",
            ExecutionStatus::Aborted => "ABORTED",
        })
    }
}

/// One status query answer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecutionDescription {
    pub execution_id: String,
    pub status: ExecutionStatus,
    /// Declared output (JSON text), present once `SUCCEEDED`.
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub cause: Option<String>,
}

/// How `await_completion` ended.
///
/// `TimedOut` reported by the engine and [`ExecutionOutcome::PollTimeoutExceeded`]
/// are different outcomes: the first is the engine's verdict, the second means
/// the caller stopped waiting while the execution was still running.
#[derive(Clone, Debug, PartialEq)]
pub enum ExecutionOutcome {
    Succeeded {
        output: Option<Value>,
    },
    Failed {
        status: ExecutionStatus,
        error: Option<String>,
        cause: Option<String>,
    },
    PollTimeoutExceeded {
        elapsed: Duration,
    },
    PollError {
        message: String,
    },
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Succeeded { .. })
    }
}

/// Poll cadence and caller-side deadline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            timeout: Duration::from_secs(30 * 60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_uses_wire_names() {
        let req = ExecutionRequest {
            bucket: "b".into(),
            file_path: "data/products.csv".into(),
            embed_columns: vec!["title".into(), "description".into()],
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(
            v,
            serde_json::json!({
                "s3_bucket": "b",
                "csv_file_path": "data/products.csv",
                "columns_to_embed": ["title", "description"]
            })
        );
    }

    #[test]
    fn terminal_set() {
        use ExecutionStatus::*;
        assert!(!Running.is_terminal());
        for s in [Succeeded, Failed, TimedOut, Aborted] {
            assert!(s.is_terminal());
        }
        assert_eq!(serde_json::to_string(&TimedOut).unwrap(), "\"TIMED_OUT\"");
        assert_eq!(TimedOut.to_string(), "TIMED_OUT");
    }
}
