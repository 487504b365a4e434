//! Execution lifecycle for the ingestion workflow.
//!
//! - [`WorkflowEngine`]: start an execution, query its status
//! - [`LocalWorkflowEngine`]: in-process engine running registered [`Stage`]s
//! - [`ExecutionOrchestrator`]: start one execution and poll it to an outcome

mod engine;
mod errors;
mod local;
mod model;
mod orchestrator;

pub use engine::{Stage, StageResponse, WorkflowEngine};
pub use errors::{Result, WorkflowError};
pub use local::{LocalWorkflowEngine, LocalWorkflowEngineBuilder, Workflow};
pub use model::{
    ExecutionDescription, ExecutionHandle, ExecutionOutcome, ExecutionRequest, ExecutionStatus,
    PollPolicy,
};
pub use orchestrator::ExecutionOrchestrator;
