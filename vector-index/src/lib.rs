//! Vector index writer.
//!
//! This crate provides:
//! - [`IndexSchema`]: the fixed mapping (text, vector with cosine metric, metadata)
//! - [`VectorStore`]: the backing-store capability (Qdrant or in-memory)
//! - [`IndexWriter`]: at-most-once index creation and idempotent per-record upserts
//!
//! Qdrant collections play the role of indexes; [`InMemoryVectorStore`] backs tests
//! and local runs.

mod config;
mod errors;
mod memory;
mod qdrant_facade;
mod record;
mod schema;
mod store;
mod writer;

use std::sync::Arc;

pub use config::{IndexConfig, StoreKind};
pub use errors::{IndexError, Result};
pub use memory::InMemoryVectorStore;
pub use qdrant_facade::QdrantStore;
pub use record::{IndexWriteResult, Metadata, RecordUnit, WriteFailure, WriteStatus};
pub use schema::{AnnMethod, DistanceKind, IndexSchema, VectorField};
pub use store::VectorStore;
pub use writer::IndexWriter;

use tracing::trace;

/// Builds the store selected by `cfg.store`.
///
/// # Errors
/// Returns `IndexError::Config` for invalid settings or a client build failure.
pub fn build_store(cfg: &IndexConfig) -> Result<Arc<dyn VectorStore>> {
    cfg.validate()?;
    trace!(store = ?cfg.store, "building vector store");
    Ok(match cfg.store {
        StoreKind::Qdrant => Arc::new(QdrantStore::new(cfg)?),
        StoreKind::Memory => Arc::new(InMemoryVectorStore::new()),
    })
}
