//! Pipeline assembly and the trigger flow.
//!
//! Every client is built here once and handed to the components that need it.

use std::sync::Arc;
use std::time::Duration;

use ai_llm_service::EmbeddingService;
use chrono::Utc;
use embedding_stages::{
    CsvProcessorStage, EmbeddingStage, EmbeddingsProvider, IndexWriterStage, ServiceEmbeddings,
};
use services::ids::execution_name_for;
use services::storage::{LocalObjectStore, ObjectStore, discover_first_csv};
use tracing::{error, info, warn};
use vector_index::{DistanceKind, IndexWriter, VectorStore, build_store};
use workflow_runner::{
    ExecutionOrchestrator, ExecutionOutcome, ExecutionRequest, LocalWorkflowEngine, PollPolicy,
    Stage, Workflow,
};

use crate::cli::Cli;
use crate::config::{AppConfig, AppError};

/// Stage wiring parameters.
#[derive(Clone, Debug)]
pub struct WorkflowSettings {
    pub dimension: usize,
    pub metric: DistanceKind,
    pub upsert_concurrency: usize,
    pub embedding_concurrency: usize,
    pub execution_timeout: Option<Duration>,
}

/// `csv-processor` → `index-writer`.
pub fn ingestion_workflow(
    storage: Arc<dyn ObjectStore>,
    provider: Arc<dyn EmbeddingsProvider>,
    store: Arc<dyn VectorStore>,
    settings: &WorkflowSettings,
) -> Workflow {
    let embedder = EmbeddingStage::new(provider).with_concurrency(settings.embedding_concurrency);
    let writer = Arc::new(IndexWriter::new(store, settings.upsert_concurrency));

    let stages: Vec<Arc<dyn Stage>> = vec![
        Arc::new(CsvProcessorStage::new(storage, embedder)),
        Arc::new(IndexWriterStage::new(writer, settings.dimension).with_metric(settings.metric)),
    ];
    let workflow = Workflow::new(stages);
    match settings.execution_timeout {
        Some(t) => workflow.with_timeout(t),
        None => workflow,
    }
}

/// Builds the execution input from the arguments, discovering the CSV key
/// when no path was given.
///
/// # Errors
/// [`AppError::Discovery`] when the bucket holds no CSV object.
pub async fn resolve_request(
    storage: &dyn ObjectStore,
    bucket: &str,
    cli: &Cli,
) -> Result<ExecutionRequest, AppError> {
    let file_path = match &cli.csv_file_path {
        Some(p) => p.clone(),
        None => {
            let key = discover_first_csv(storage, bucket)
                .await
                .map_err(|e| AppError::Discovery(e.to_string()))?;
            info!(%key, "auto-discovered CSV file");
            key
        }
    };
    Ok(ExecutionRequest {
        bucket: bucket.to_string(),
        file_path,
        embed_columns: cli.embed_columns(),
    })
}

/// Starts one execution for `request` and waits for its outcome.
pub async fn trigger(
    orchestrator: &ExecutionOrchestrator,
    request: &ExecutionRequest,
    poll: PollPolicy,
) -> Result<ExecutionOutcome, AppError> {
    info!(
        file = %request.file_path,
        columns = ?request.embed_columns,
        workflow = orchestrator.workflow_id(),
        "triggering pipeline"
    );
    let name = execution_name_for(&request.file_path, Utc::now());
    let handle = orchestrator
        .start(request, Some(&name))
        .await
        .map_err(|e| AppError::ExecutionStart(e.to_string()))?;

    let outcome = orchestrator.await_completion(&handle, poll).await;
    report(&outcome);
    Ok(outcome)
}

fn report(outcome: &ExecutionOutcome) {
    match outcome {
        ExecutionOutcome::Succeeded { output } => {
            let message = output
                .as_ref()
                .and_then(|o| o.pointer("/body/message"))
                .and_then(|m| m.as_str())
                .unwrap_or("pipeline completed");
            info!("{message}");
        }
        ExecutionOutcome::Failed {
            status,
            error,
            cause,
        } => error!(
            %status,
            error = error.as_deref().unwrap_or("-"),
            cause = cause.as_deref().unwrap_or("-"),
            "pipeline failed"
        ),
        ExecutionOutcome::PollTimeoutExceeded { elapsed } => {
            warn!(?elapsed, "gave up waiting for the pipeline")
        }
        ExecutionOutcome::PollError { message } => error!(%message, "lost track of the pipeline"),
    }
}

/// Assembles the local pipeline from `cfg` and runs one execution.
pub async fn run(cfg: AppConfig, cli: &Cli) -> Result<ExecutionOutcome, AppError> {
    let storage: Arc<dyn ObjectStore> = Arc::new(LocalObjectStore::new(&cfg.storage_root));

    let service = EmbeddingService::new(cfg.embedding.clone())
        .map_err(|e| AppError::Configuration(e.to_string()))?;
    let provider: Arc<dyn EmbeddingsProvider> =
        Arc::new(ServiceEmbeddings::new(service).with_dimension(cfg.index.dimension));
    let store = build_store(&cfg.index).map_err(|e| AppError::Configuration(e.to_string()))?;

    let request = resolve_request(storage.as_ref(), &cfg.bucket, cli).await?;

    let settings = WorkflowSettings {
        dimension: cfg.index.dimension,
        metric: cfg.index.distance,
        upsert_concurrency: cfg.index.upsert_concurrency,
        embedding_concurrency: cfg.embedding_concurrency,
        execution_timeout: cfg.execution_timeout,
    };
    let engine = LocalWorkflowEngine::builder()
        .register(
            cfg.workflow_arn.clone(),
            ingestion_workflow(storage, provider, store, &settings),
        )
        .build();
    let orchestrator = ExecutionOrchestrator::new(Arc::new(engine), cfg.workflow_arn);

    trigger(&orchestrator, &request, cfg.poll).await
}
