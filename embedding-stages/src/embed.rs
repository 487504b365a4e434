//! Embedding stage: one provider call per row, assembled into [`RecordUnit`]s.

use std::sync::Arc;

use ai_llm_service::EmbeddingService;
use futures::future::BoxFuture;
use futures::{StreamExt, TryStreamExt, stream};
use services::ids::record_id;
use tracing::{debug, error, info};
use vector_index::RecordUnit;

use crate::errors::{EmbedError, Result, StageError};
use crate::extract::ExtractedRow;

/// Text → fixed-length vector.
pub trait EmbeddingsProvider: Send + Sync {
    fn embed<'a>(
        &'a self,
        text: &'a str,
    ) -> BoxFuture<'a, std::result::Result<Vec<f32>, EmbedError>>;
}

impl<T: EmbeddingsProvider + ?Sized> EmbeddingsProvider for Arc<T> {
    fn embed<'a>(
        &'a self,
        text: &'a str,
    ) -> BoxFuture<'a, std::result::Result<Vec<f32>, EmbedError>> {
        (**self).embed(text)
    }
}

/// [`EmbeddingsProvider`] over an HTTP embedding backend, with shape checks.
pub struct ServiceEmbeddings {
    service: EmbeddingService,
    dimension: Option<usize>,
}

impl ServiceEmbeddings {
    pub fn new(service: EmbeddingService) -> Self {
        Self {
            service,
            dimension: None,
        }
    }

    /// Rejects vectors whose length is not `dimension`.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = Some(dimension);
        self
    }
}

/// Shape checks shared by every backend response.
fn check_vector(v: &[f32], dimension: Option<usize>) -> std::result::Result<(), EmbedError> {
    if v.is_empty() {
        return Err(EmbedError("empty embedding vector".into()));
    }
    if let Some(want) = dimension {
        if v.len() != want {
            return Err(EmbedError(format!(
                "embedding has {} dimensions, expected {want}",
                v.len()
            )));
        }
    }
    if let Some(pos) = v.iter().position(|x| !x.is_finite()) {
        return Err(EmbedError(format!("non-finite value at position {pos}")));
    }
    Ok(())
}

impl EmbeddingsProvider for ServiceEmbeddings {
    fn embed<'a>(
        &'a self,
        text: &'a str,
    ) -> BoxFuture<'a, std::result::Result<Vec<f32>, EmbedError>> {
        Box::pin(async move {
            let v = self
                .service
                .embed(text)
                .await
                .map_err(|e| EmbedError(e.to_string()))?;
            check_vector(&v, self.dimension)?;
            Ok(v)
        })
    }
}

/// Calls the provider once per row and assembles record units.
///
/// Rows are embedded in extraction order, one at a time by default. The first
/// failing row fails the whole file and no later record is returned.
#[derive(Clone)]
pub struct EmbeddingStage {
    provider: Arc<dyn EmbeddingsProvider>,
    concurrency: usize,
}

impl EmbeddingStage {
    pub fn new(provider: Arc<dyn EmbeddingsProvider>) -> Self {
        Self {
            provider,
            concurrency: 1,
        }
    }

    /// Allows up to `n` in-flight calls. Output order stays the row order.
    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    async fn embed_row(&self, basename: &str, row: ExtractedRow) -> Result<RecordUnit> {
        let id = record_id(basename, row.index);
        debug!(row = row.index, %id, "embedding row");
        let embedding = self
            .provider
            .embed(&row.text)
            .await
            .map_err(|e| StageError::EmbeddingService {
                row: row.index,
                message: e.0,
            })?;
        Ok(RecordUnit {
            id,
            text: row.text,
            embedding,
            metadata: row.metadata,
        })
    }

    /// Embeds every row of the file `basename`.
    ///
    /// # Errors
    /// The first extraction error or [`StageError::EmbeddingService`] for the
    /// first failing row.
    pub async fn embed_rows<I>(&self, basename: &str, rows: I) -> Result<Vec<RecordUnit>>
    where
        I: IntoIterator<Item = Result<ExtractedRow>>,
    {
        let records: Result<Vec<RecordUnit>> = if self.concurrency == 1 {
            let mut out = Vec::new();
            let mut failed = None;
            for row in rows {
                match row {
                    Ok(row) => match self.embed_row(basename, row).await {
                        Ok(unit) => out.push(unit),
                        Err(e) => {
                            failed = Some(e);
                            break;
                        }
                    },
                    Err(e) => {
                        failed = Some(e);
                        break;
                    }
                }
            }
            match failed {
                Some(e) => Err(e),
                None => Ok(out),
            }
        } else {
            stream::iter(rows)
                .map(|row| async move { self.embed_row(basename, row?).await })
                .buffered(self.concurrency)
                .try_collect()
                .await
        };

        match &records {
            Ok(r) => info!(file = basename, total = r.len(), "embedded rows"),
            Err(e) => error!(file = basename, error = %e, "embedding failed"),
        }
        records
    }
}
