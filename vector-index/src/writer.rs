//! Index writer: at-most-once index creation and per-record upserts.
//!
//! Each index name owns a `OnceCell` holding its declared dimension. The map
//! lock is only held to fetch the cell; the remote existence check and create
//! run inside the cell's initializer, so callers for the same name wait on
//! each other and nobody else does. Record writes run with bounded
//! concurrency; one failed record never aborts the rest of the batch.

use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

use crate::errors::{IndexError, Result};
use crate::record::{IndexWriteResult, RecordUnit, WriteFailure, WriteStatus};
use crate::schema::IndexSchema;
use crate::store::VectorStore;

/// Writes record units into a [`VectorStore`].
pub struct IndexWriter {
    store: Arc<dyn VectorStore>,
    concurrency: usize,
    /// Index name → declared dimension, set once the index is ensured.
    ensured: Mutex<HashMap<String, Arc<OnceCell<usize>>>>,
}

impl IndexWriter {
    pub fn new(store: Arc<dyn VectorStore>, concurrency: usize) -> Self {
        Self {
            store,
            concurrency: concurrency.max(1),
            ensured: Mutex::new(HashMap::new()),
        }
    }

    /// Ensures the index exists, creating it with `schema` if absent.
    ///
    /// Never alters an existing index. A create that fails because another
    /// writer created the index first is treated as success.
    pub async fn ensure_index(&self, schema: &IndexSchema) -> Result<()> {
        let cell = self
            .ensured
            .lock()
            .await
            .entry(schema.name.clone())
            .or_default()
            .clone();

        if cell.initialized() {
            debug!(index = %schema.name, "index already ensured");
            return Ok(());
        }
        cell.get_or_try_init(|| self.create_if_absent(schema)).await?;
        Ok(())
    }

    async fn create_if_absent(&self, schema: &IndexSchema) -> Result<usize> {
        if self.store.index_exists(&schema.name).await? {
            debug!(index = %schema.name, "index exists, leaving schema untouched");
        } else if let Err(e) = self.store.create_index(schema).await {
            if !self.store.index_exists(&schema.name).await.unwrap_or(false) {
                return Err(e);
            }
            warn!(index = %schema.name, error = %e, "index appeared concurrently");
        } else {
            info!(index = %schema.name, dimension = schema.vector.dimension, "index created");
        }
        Ok(schema.vector.dimension)
    }

    /// Dimension declared through [`Self::ensure_index`], if it completed.
    async fn declared_dimension(&self, index: &str) -> Option<usize> {
        let ensured = self.ensured.lock().await;
        ensured.get(index).and_then(|cell| cell.get().copied())
    }

    /// Upserts one record keyed by its id.
    ///
    /// # Errors
    /// [`IndexError::VectorSizeMismatch`] if the record does not match the
    /// dimension declared through [`Self::ensure_index`]; store errors otherwise.
    pub async fn upsert(&self, index: &str, record: &RecordUnit) -> Result<WriteStatus> {
        if let Some(want) = self.declared_dimension(index).await {
            if record.embedding.len() != want {
                return Err(IndexError::VectorSizeMismatch {
                    got: record.embedding.len(),
                    want,
                });
            }
        }
        self.store.upsert(index, record).await
    }

    async fn tagged<'a>(
        &'a self,
        index: &'a str,
        record: &'a RecordUnit,
    ) -> (&'a str, Result<WriteStatus>) {
        (record.id.as_str(), self.upsert(index, record).await)
    }

    /// Writes every record, counting only `created`/`updated` as written.
    pub async fn write_all(&self, index: &str, records: &[RecordUnit]) -> IndexWriteResult {
        info!(
            index,
            total = records.len(),
            concurrency = self.concurrency,
            "writing records"
        );

        // Futures are built up front so the stream carries no higher-ranked
        // closure; the resulting future stays `Send`.
        let pending: Vec<_> = records.iter().map(|r| self.tagged(index, r)).collect();
        let outcomes: Vec<(&str, Result<WriteStatus>)> = stream::iter(pending)
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut result = IndexWriteResult {
            index_name: index.to_string(),
            records_attempted: records.len(),
            ..Default::default()
        };
        for (id, outcome) in outcomes {
            match outcome {
                Ok(status) if status.is_written() => result.records_written += 1,
                Ok(status) => debug!(index, id, ?status, "record not written"),
                Err(e) => {
                    warn!(index, id, error = %e, "record write failed");
                    result.failures.push(WriteFailure {
                        id: id.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        // buffer_unordered completes out of order; keep reports stable.
        result.failures.sort_by(|a, b| a.id.cmp(&b.id));

        info!(
            index,
            attempted = result.records_attempted,
            written = result.records_written,
            failed = result.failures.len(),
            "write finished"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryVectorStore;
    use crate::schema::DistanceKind;
    use futures::future::BoxFuture;
    use std::time::Duration;
    use tokio::sync::Notify;

    fn record(id: &str, dim: usize) -> RecordUnit {
        RecordUnit {
            id: id.into(),
            text: format!("text of {id}"),
            embedding: vec![0.5; dim],
            metadata: Default::default(),
        }
    }

    #[tokio::test]
    async fn ensure_index_creates_at_most_once() {
        let store = Arc::new(InMemoryVectorStore::new());
        let writer = IndexWriter::new(store.clone(), 4);
        let schema = IndexSchema::for_file("file", 4, DistanceKind::Cosine);

        for _ in 0..5 {
            writer.ensure_index(&schema).await.unwrap();
        }
        assert_eq!(store.create_calls(), 1);

        // A fresh writer over the same store sees the index and does not recreate it.
        let again = IndexWriter::new(store.clone(), 4);
        again.ensure_index(&schema).await.unwrap();
        assert_eq!(store.create_calls(), 1);
    }

    #[tokio::test]
    async fn rewrite_keeps_document_count() {
        let store = Arc::new(InMemoryVectorStore::new());
        let writer = IndexWriter::new(store.clone(), 2);
        let schema = IndexSchema::for_file("file", 4, DistanceKind::Cosine);
        writer.ensure_index(&schema).await.unwrap();

        let records = vec![record("file_0", 4), record("file_1", 4)];
        let first = writer.write_all("file", &records).await;
        let second = writer.write_all("file", &records).await;

        assert_eq!(first.records_written, 2);
        assert_eq!(second.records_attempted, 2);
        assert_eq!(second.records_written, 2);
        assert_eq!(store.count("file").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn dimension_mismatch_is_a_record_failure() {
        let store = Arc::new(InMemoryVectorStore::new());
        let writer = IndexWriter::new(store.clone(), 2);
        let schema = IndexSchema::for_file("file", 4, DistanceKind::Cosine);
        writer.ensure_index(&schema).await.unwrap();

        let records = vec![record("file_0", 4), record("file_1", 3), record("file_2", 4)];
        let res = writer.write_all("file", &records).await;

        assert_eq!(res.records_attempted, 3);
        assert_eq!(res.records_written, 2);
        assert_eq!(res.failures.len(), 1);
        assert_eq!(res.failures[0].id, "file_1");
    }

    /// Fails writes for chosen ids, reports `noop` for others on request.
    struct FlakyStore {
        inner: InMemoryVectorStore,
        fail: Vec<&'static str>,
        noop: Vec<&'static str>,
    }

    impl VectorStore for FlakyStore {
        fn index_exists<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<bool>> {
            self.inner.index_exists(name)
        }

        fn create_index<'a>(&'a self, schema: &'a IndexSchema) -> BoxFuture<'a, Result<()>> {
            self.inner.create_index(schema)
        }

        fn upsert<'a>(
            &'a self,
            index: &'a str,
            record: &'a RecordUnit,
        ) -> BoxFuture<'a, Result<WriteStatus>> {
            Box::pin(async move {
                if self.fail.iter().any(|f| *f == record.id) {
                    return Err(IndexError::Store("503 unavailable".into()));
                }
                if self.noop.iter().any(|f| *f == record.id) {
                    return Ok(WriteStatus::Noop);
                }
                self.inner.upsert(index, record).await
            })
        }

        fn count<'a>(&'a self, index: &'a str) -> BoxFuture<'a, Result<u64>> {
            self.inner.count(index)
        }
    }

    #[tokio::test]
    async fn partial_failure_does_not_abort_batch() {
        let store = Arc::new(FlakyStore {
            inner: InMemoryVectorStore::new(),
            fail: vec!["f_1", "f_3"],
            noop: vec!["f_4"],
        });
        let writer = IndexWriter::new(store.clone(), 3);
        writer
            .ensure_index(&IndexSchema::for_file("f", 2, DistanceKind::Cosine))
            .await
            .unwrap();

        let records: Vec<_> = (0..5).map(|i| record(&format!("f_{i}"), 2)).collect();
        let res = writer.write_all("f", &records).await;

        assert_eq!(res.records_attempted, 5);
        assert_eq!(res.records_written, 2);
        let failed: Vec<_> = res.failures.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(failed, ["f_1", "f_3"]);
        assert!(res.failures[0].reason.contains("503"));
        assert_eq!(store.count("f").await.unwrap(), 2);
    }

    fn assert_send<T: Send>(_: &T) {}

    #[tokio::test]
    async fn write_all_future_is_send() {
        let writer = Arc::new(IndexWriter::new(Arc::new(InMemoryVectorStore::new()), 2));
        writer
            .ensure_index(&IndexSchema::for_file("file", 2, DistanceKind::Cosine))
            .await
            .unwrap();
        let records = vec![record("file_0", 2)];
        let fut = writer.write_all("file", &records);
        assert_send(&fut);
        assert_eq!(fut.await.records_attempted, 1);

        let handle = tokio::spawn({
            let writer = writer.clone();
            async move { writer.write_all("file", &[record("file_1", 2)]).await }
        });
        assert_eq!(handle.await.unwrap().records_written, 1);
    }

    /// Blocks `index_exists("slow")` until `release` is notified.
    struct GatedStore {
        inner: InMemoryVectorStore,
        entered: Notify,
        release: Notify,
    }

    impl VectorStore for GatedStore {
        fn index_exists<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<bool>> {
            Box::pin(async move {
                if name == "slow" {
                    self.entered.notify_one();
                    self.release.notified().await;
                }
                self.inner.index_exists(name).await
            })
        }

        fn create_index<'a>(&'a self, schema: &'a IndexSchema) -> BoxFuture<'a, Result<()>> {
            self.inner.create_index(schema)
        }

        fn upsert<'a>(
            &'a self,
            index: &'a str,
            record: &'a RecordUnit,
        ) -> BoxFuture<'a, Result<WriteStatus>> {
            self.inner.upsert(index, record)
        }

        fn count<'a>(&'a self, index: &'a str) -> BoxFuture<'a, Result<u64>> {
            self.inner.count(index)
        }
    }

    #[tokio::test]
    async fn slow_index_check_does_not_block_other_indexes() {
        let store = Arc::new(GatedStore {
            inner: InMemoryVectorStore::new(),
            entered: Notify::new(),
            release: Notify::new(),
        });
        let writer = Arc::new(IndexWriter::new(store.clone(), 2));
        writer
            .ensure_index(&IndexSchema::for_file("fast", 2, DistanceKind::Cosine))
            .await
            .unwrap();

        let slow = tokio::spawn({
            let writer = writer.clone();
            async move {
                writer
                    .ensure_index(&IndexSchema::for_file("slow", 2, DistanceKind::Cosine))
                    .await
            }
        });
        store.entered.notified().await;

        let status = tokio::time::timeout(
            Duration::from_secs(1),
            writer.upsert("fast", &record("fast_0", 2)),
        )
        .await
        .expect("upsert waited on another index's existence check")
        .unwrap();
        assert_eq!(status, WriteStatus::Created);

        // Dimension guard still applies while the other index is pending.
        let err = writer.upsert("fast", &record("fast_1", 3)).await.unwrap_err();
        assert!(matches!(err, IndexError::VectorSizeMismatch { got: 3, want: 2 }));

        store.release.notify_one();
        slow.await.unwrap().unwrap();
        assert_eq!(store.inner.create_calls(), 2);
    }

    /// `create_index` creates the index and then reports an error, as when
    /// another writer won the race; or fails outright when `create` is false.
    struct RacingCreateStore {
        inner: InMemoryVectorStore,
        create: bool,
    }

    impl VectorStore for RacingCreateStore {
        fn index_exists<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<bool>> {
            self.inner.index_exists(name)
        }

        fn create_index<'a>(&'a self, schema: &'a IndexSchema) -> BoxFuture<'a, Result<()>> {
            Box::pin(async move {
                if self.create {
                    self.inner.create_index(schema).await?;
                }
                Err(IndexError::Store("resource_already_exists".into()))
            })
        }

        fn upsert<'a>(
            &'a self,
            index: &'a str,
            record: &'a RecordUnit,
        ) -> BoxFuture<'a, Result<WriteStatus>> {
            self.inner.upsert(index, record)
        }

        fn count<'a>(&'a self, index: &'a str) -> BoxFuture<'a, Result<u64>> {
            self.inner.count(index)
        }
    }

    #[tokio::test]
    async fn failed_create_of_existing_index_counts_as_ensured() {
        let store = Arc::new(RacingCreateStore {
            inner: InMemoryVectorStore::new(),
            create: true,
        });
        let writer = IndexWriter::new(store.clone(), 2);
        let schema = IndexSchema::for_file("file", 2, DistanceKind::Cosine);

        writer.ensure_index(&schema).await.unwrap();
        writer.ensure_index(&schema).await.unwrap();
        assert_eq!(store.inner.create_calls(), 1);

        let err = writer.upsert("file", &record("file_0", 5)).await.unwrap_err();
        assert!(matches!(err, IndexError::VectorSizeMismatch { got: 5, want: 2 }));
        assert_eq!(
            writer.upsert("file", &record("file_0", 2)).await.unwrap(),
            WriteStatus::Created
        );
    }

    #[tokio::test]
    async fn failed_create_of_absent_index_is_an_error_and_retried() {
        let store = Arc::new(RacingCreateStore {
            inner: InMemoryVectorStore::new(),
            create: false,
        });
        let writer = IndexWriter::new(store.clone(), 2);
        let schema = IndexSchema::for_file("file", 2, DistanceKind::Cosine);

        let err = writer.ensure_index(&schema).await.unwrap_err();
        assert!(err.to_string().contains("resource_already_exists"));
        // Nothing was recorded, so the next call tries again.
        assert!(writer.ensure_index(&schema).await.is_err());
    }
}
