//! Stage handlers run by the workflow engine.
//!
//! Both handlers turn every failure into a `500` envelope with
//! `body = {"error": message}`; nothing propagates past [`Stage::invoke`].

use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;
use services::ids::file_basename;
use services::storage::ObjectStore;
use tracing::{error, info};
use vector_index::{DistanceKind, IndexSchema, IndexWriter};
use workflow_runner::{ExecutionRequest, Stage, StageResponse};

use crate::embed::EmbeddingStage;
use crate::errors::Result;
use crate::extract::extract;
use crate::payload::{EmbeddingEnvelope, EmbeddingOutput, IndexOutput};

pub const CSV_PROCESSOR: &str = "csv-processor";
pub const INDEX_WRITER: &str = "index-writer";

fn respond<T: serde::Serialize>(stage: &str, result: Result<T>) -> StageResponse {
    match result.and_then(|body| Ok(serde_json::to_value(body)?)) {
        Ok(body) => StageResponse::ok(body),
        Err(e) => {
            error!(stage, error = %e, "stage failed");
            StageResponse::failed(e.to_string())
        }
    }
}

/// Reads the CSV named by the execution input, embeds every row and returns
/// an [`EmbeddingOutput`].
pub struct CsvProcessorStage {
    storage: Arc<dyn ObjectStore>,
    embedder: EmbeddingStage,
}

impl CsvProcessorStage {
    pub fn new(storage: Arc<dyn ObjectStore>, embedder: EmbeddingStage) -> Self {
        Self { storage, embedder }
    }

    async fn process(&self, input: Value) -> Result<EmbeddingOutput> {
        let request: ExecutionRequest = serde_json::from_value(input)?;
        let content = self
            .storage
            .get_object(&request.bucket, &request.file_path)
            .await?;
        let basename = file_basename(&request.file_path);
        info!(bucket = %request.bucket, key = %request.file_path, "processing CSV");

        let rows = extract(&content, &request.embed_columns)?;
        let records = self.embedder.embed_rows(basename, rows).await?;

        Ok(EmbeddingOutput {
            total_records: records.len(),
            embeddings_data: records,
            csv_filename: basename.to_string(),
        })
    }
}

impl Stage for CsvProcessorStage {
    fn name(&self) -> &str {
        CSV_PROCESSOR
    }

    fn invoke(&self, input: Value) -> BoxFuture<'_, StageResponse> {
        Box::pin(async move { respond(CSV_PROCESSOR, self.process(input).await) })
    }
}

/// Ensures the per-file index exists and writes every embedded record.
///
/// Per-record write failures do not fail the stage; they are reported in
/// [`IndexOutput::failures`].
pub struct IndexWriterStage {
    writer: Arc<IndexWriter>,
    dimension: usize,
    metric: DistanceKind,
}

impl IndexWriterStage {
    pub fn new(writer: Arc<IndexWriter>, dimension: usize) -> Self {
        Self {
            writer,
            dimension,
            metric: DistanceKind::Cosine,
        }
    }

    pub fn with_metric(mut self, metric: DistanceKind) -> Self {
        self.metric = metric;
        self
    }

    async fn process(&self, input: Value) -> Result<IndexOutput> {
        let EmbeddingEnvelope { body } = serde_json::from_value(input)?;
        let schema = IndexSchema::for_file(&body.csv_filename, self.dimension, self.metric);

        self.writer.ensure_index(&schema).await?;
        let result = self.writer.write_all(&schema.name, &body.embeddings_data).await;

        Ok(IndexOutput::new(
            result.index_name,
            result.records_written,
            result.records_attempted,
            result.failures,
        ))
    }
}

impl Stage for IndexWriterStage {
    fn name(&self) -> &str {
        INDEX_WRITER
    }

    fn invoke(&self, input: Value) -> BoxFuture<'_, StageResponse> {
        Box::pin(async move { respond(INDEX_WRITER, self.process(input).await) })
    }
}
