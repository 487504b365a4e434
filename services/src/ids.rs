//! Record identifiers, index names and execution names.
//!
//! Record ids are `{basename}_{row}` where `basename` is the last path
//! segment cut at its first dot (`data/products.v2.csv` → `products`). The
//! same file and row index always produce the same id.

use chrono::{DateTime, Utc};

/// Last path segment up to (excluding) its first `.`.
pub fn file_basename(path: &str) -> &str {
    let last = path.rsplit('/').next().unwrap_or(path);
    last.split('.').next().unwrap_or(last)
}

/// Deterministic record id for row `row` (0-based) of the file `basename`.
pub fn record_id(basename: &str, row: usize) -> String {
    format!("{basename}_{row}")
}

/// Index name for a file basename: lowercase, `_` → `-`.
pub fn index_name(basename: &str) -> String {
    basename.to_lowercase().replace('_', "-")
}

/// Default execution name when the caller does not supply one.
pub fn default_execution_name(now: DateTime<Utc>) -> String {
    format!("ecs-trigger-{}", now.timestamp())
}

/// Execution name derived from the input file path and the current time.
pub fn execution_name_for(path: &str, now: DateTime<Utc>) -> String {
    let stem = path.replace('/', "-").replace(".csv", "");
    format!("ecs-{stem}-{}", now.timestamp())
}
