//! Process-local [`VectorStore`] with the same upsert contract as Qdrant.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::future::BoxFuture;
use tokio::sync::RwLock;
use tracing::debug;

use crate::errors::{IndexError, Result};
use crate::record::{RecordUnit, WriteStatus};
use crate::schema::IndexSchema;
use crate::store::VectorStore;

struct MemIndex {
    schema: IndexSchema,
    docs: HashMap<String, RecordUnit>,
}

/// In-memory vector store keyed by index name then record id.
///
/// Re-writing an id reports [`WriteStatus::Updated`] even for identical
/// content, the same as Qdrant.
#[derive(Default)]
pub struct InMemoryVectorStore {
    indexes: RwLock<HashMap<String, MemIndex>>,
    create_calls: AtomicUsize,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times [`VectorStore::create_index`] was invoked.
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Snapshot of one document.
    pub async fn document(&self, index: &str, id: &str) -> Option<RecordUnit> {
        self.indexes
            .read()
            .await
            .get(index)
            .and_then(|i| i.docs.get(id).cloned())
    }

    /// Declared schema of an existing index.
    pub async fn schema(&self, index: &str) -> Option<IndexSchema> {
        self.indexes.read().await.get(index).map(|i| i.schema.clone())
    }
}

impl VectorStore for InMemoryVectorStore {
    fn index_exists<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<bool>> {
        Box::pin(async move { Ok(self.indexes.read().await.contains_key(name)) })
    }

    fn create_index<'a>(&'a self, schema: &'a IndexSchema) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            let mut w = self.indexes.write().await;
            if w.contains_key(&schema.name) {
                return Err(IndexError::Store(format!(
                    "index {} already exists",
                    schema.name
                )));
            }
            w.insert(
                schema.name.clone(),
                MemIndex {
                    schema: schema.clone(),
                    docs: HashMap::new(),
                },
            );
            debug!(index = %schema.name, "memory index created");
            Ok(())
        })
    }

    fn upsert<'a>(
        &'a self,
        index: &'a str,
        record: &'a RecordUnit,
    ) -> BoxFuture<'a, Result<WriteStatus>> {
        Box::pin(async move {
            let mut w = self.indexes.write().await;
            let idx = w
                .get_mut(index)
                .ok_or_else(|| IndexError::IndexNotFound(index.to_string()))?;

            let want = idx.schema.vector.dimension;
            if record.embedding.len() != want {
                return Err(IndexError::VectorSizeMismatch {
                    got: record.embedding.len(),
                    want,
                });
            }

            let status = match idx.docs.insert(record.id.clone(), record.clone()) {
                Some(_) => WriteStatus::Updated,
                None => WriteStatus::Created,
            };
            Ok(status)
        })
    }

    fn count<'a>(&'a self, index: &'a str) -> BoxFuture<'a, Result<u64>> {
        Box::pin(async move {
            self.indexes
                .read()
                .await
                .get(index)
                .map(|i| i.docs.len() as u64)
                .ok_or_else(|| IndexError::IndexNotFound(index.to_string()))
        })
    }
}
