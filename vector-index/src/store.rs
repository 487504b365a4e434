//! Backing-store capability required by the writer.

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::errors::Result;
use crate::record::{RecordUnit, WriteStatus};
use crate::schema::IndexSchema;

/// A vector store with deterministic-key upsert semantics.
///
/// Implementations must make per-id upserts atomic: writing the same id twice
/// never yields two documents.
pub trait VectorStore: Send + Sync {
    fn index_exists<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<bool>>;

    /// Creates the index; callers check existence first.
    fn create_index<'a>(&'a self, schema: &'a IndexSchema) -> BoxFuture<'a, Result<()>>;

    /// Creates or replaces the document keyed by `record.id`.
    fn upsert<'a>(
        &'a self,
        index: &'a str,
        record: &'a RecordUnit,
    ) -> BoxFuture<'a, Result<WriteStatus>>;

    /// Number of documents in the index.
    fn count<'a>(&'a self, index: &'a str) -> BoxFuture<'a, Result<u64>>;
}

impl<T: VectorStore + ?Sized> VectorStore for Arc<T> {
    fn index_exists<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<bool>> {
        (**self).index_exists(name)
    }

    fn create_index<'a>(&'a self, schema: &'a IndexSchema) -> BoxFuture<'a, Result<()>> {
        (**self).create_index(schema)
    }

    fn upsert<'a>(
        &'a self,
        index: &'a str,
        record: &'a RecordUnit,
    ) -> BoxFuture<'a, Result<WriteStatus>> {
        (**self).upsert(index, record)
    }

    fn count<'a>(&'a self, index: &'a str) -> BoxFuture<'a, Result<u64>> {
        (**self).count(index)
    }
}
