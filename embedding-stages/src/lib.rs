//! Pipeline stages: CSV extraction, per-row embedding and index writing.
//!
//! [`CsvProcessorStage`] and [`IndexWriterStage`] implement
//! [`workflow_runner::Stage`] and are registered, in that order, as the
//! ingestion workflow.

mod embed;
mod errors;
mod extract;
mod handlers;
mod payload;

pub use embed::{EmbeddingStage, EmbeddingsProvider, ServiceEmbeddings};
pub use errors::{EmbedError, Result, StageError};
pub use extract::{ExtractedRow, Extraction, Row, extract, extract_all};
pub use handlers::{CSV_PROCESSOR, CsvProcessorStage, INDEX_WRITER, IndexWriterStage};
pub use payload::{EmbeddingOutput, IndexOutput};
