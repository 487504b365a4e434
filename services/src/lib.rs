//! Shared helpers for the ingestion pipeline: deterministic identifiers and
//! bulk-storage access.

pub mod ids;
pub mod storage;
pub mod uuid;
