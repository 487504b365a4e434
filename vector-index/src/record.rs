//! Core data models used by the writer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Column name → raw string value for every non-embedded column of a row.
pub type Metadata = BTreeMap<String, String>;

/// The atomic item written to a vector index.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordUnit {
    pub id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Outcome of one successful store write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteStatus {
    Created,
    Updated,
    /// Store accepted the request but skipped it (content unchanged).
    Noop,
}

impl WriteStatus {
    /// Only `created`/`updated` count as written.
    pub fn is_written(self) -> bool {
        matches!(self, WriteStatus::Created | WriteStatus::Updated)
    }
}

/// A record the store refused or failed to write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteFailure {
    pub id: String,
    pub reason: String,
}

/// Aggregate of a batch write.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexWriteResult {
    pub index_name: String,
    pub records_attempted: usize,
    pub records_written: usize,
    #[serde(default)]
    pub failures: Vec<WriteFailure>,
}
