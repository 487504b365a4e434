//! In-process workflow engine.
//!
//! Each registered workflow is an ordered list of [`Stage`]s. Starting an
//! execution spawns one tokio task that feeds the input through the stages
//! sequentially. The first non-200 stage response fails the execution with
//! `error = "States.TaskFailed"` and `cause = body.error`; the last response
//! becomes the execution output. Status moves `RUNNING → terminal` once and
//! never changes afterwards.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use serde_json::Value;
use tokio::sync::RwLock;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::engine::{Stage, WorkflowEngine};
use crate::errors::{Result, WorkflowError};
use crate::model::{ExecutionDescription, ExecutionStatus};

const MAX_NAME_LEN: usize = 80;
const FORBIDDEN_NAME_CHARS: &str = "<>{}[]?*\"#%\\^|~`$&,;:/";

/// A named sequence of stages with an optional execution deadline.
#[derive(Clone)]
pub struct Workflow {
    stages: Vec<Arc<dyn Stage>>,
    timeout: Option<Duration>,
}

impl Workflow {
    pub fn new(stages: Vec<Arc<dyn Stage>>) -> Self {
        Self {
            stages,
            timeout: None,
        }
    }

    /// Executions running longer than `timeout` end as `TIMED_OUT`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

struct ExecutionRecord {
    description: ExecutionDescription,
    task: Option<AbortHandle>,
}

impl ExecutionRecord {
    /// Applies a terminal transition; ignored if already terminal.
    fn finish(
        &mut self,
        status: ExecutionStatus,
        output: Option<String>,
        error: Option<String>,
        cause: Option<String>,
    ) -> bool {
        if self.description.status.is_terminal() {
            return false;
        }
        self.description.status = status;
        self.description.output = output;
        self.description.error = error;
        self.description.cause = cause;
        self.task = None;
        true
    }
}

#[derive(Default)]
struct Inner {
    workflows: HashMap<String, Workflow>,
    executions: RwLock<HashMap<String, ExecutionRecord>>,
}

/// Local [`WorkflowEngine`].
#[derive(Clone, Default)]
pub struct LocalWorkflowEngine {
    inner: Arc<Inner>,
}

impl LocalWorkflowEngine {
    pub fn builder() -> LocalWorkflowEngineBuilder {
        LocalWorkflowEngineBuilder::default()
    }

    /// Stops a running execution (`ABORTED`). Returns `false` if it had
    /// already reached a terminal status.
    pub async fn stop_execution(
        &self,
        execution_id: &str,
        error: Option<String>,
        cause: Option<String>,
    ) -> Result<bool> {
        let mut map = self.inner.executions.write().await;
        let rec = map
            .get_mut(execution_id)
            .ok_or_else(|| WorkflowError::ExecutionNotFound(execution_id.to_string()))?;
        let task = rec.task.take();
        let stopped = rec.finish(ExecutionStatus::Aborted, None, error, cause);
        if let Some(task) = task {
            task.abort();
        }
        if stopped {
            info!(execution_id, "execution aborted");
        }
        Ok(stopped)
    }
}

#[derive(Default)]
pub struct LocalWorkflowEngineBuilder {
    workflows: HashMap<String, Workflow>,
}

impl LocalWorkflowEngineBuilder {
    pub fn register(mut self, workflow_id: impl Into<String>, workflow: Workflow) -> Self {
        self.workflows.insert(workflow_id.into(), workflow);
        self
    }

    pub fn build(self) -> LocalWorkflowEngine {
        LocalWorkflowEngine {
            inner: Arc::new(Inner {
                workflows: self.workflows,
                executions: RwLock::new(HashMap::new()),
            }),
        }
    }
}

fn validate_name(name: &str) -> Result<()> {
    let len = name.chars().count();
    if len == 0 || len > MAX_NAME_LEN {
        return Err(WorkflowError::ExecutionStart(format!(
            "execution name must be 1..={MAX_NAME_LEN} characters, got {len}"
        )));
    }
    if let Some(c) = name
        .chars()
        .find(|c| c.is_whitespace() || c.is_control() || FORBIDDEN_NAME_CHARS.contains(*c))
    {
        return Err(WorkflowError::ExecutionStart(format!(
            "execution name {name:?} contains invalid character {c:?}"
        )));
    }
    Ok(())
}

/// Runs the stages; returns `(status, output, error, cause)`.
async fn run_stages(
    stages: &[Arc<dyn Stage>],
    input: Value,
) -> (ExecutionStatus, Option<String>, Option<String>, Option<String>) {
    let mut current = input;
    for stage in stages {
        debug!(stage = stage.name(), "invoking stage");
        let resp = stage.invoke(current).await;
        if !resp.is_ok() {
            warn!(stage = stage.name(), status = resp.status_code, "stage failed");
            return (
                ExecutionStatus::Failed,
                None,
                Some("States.TaskFailed".into()),
                Some(resp.error_message()),
            );
        }
        current = match serde_json::to_value(&resp) {
            Ok(v) => v,
            Err(e) => {
                return (
                    ExecutionStatus::Failed,
                    None,
                    Some("States.Runtime".into()),
                    Some(e.to_string()),
                );
            }
        };
    }
    (ExecutionStatus::Succeeded, Some(current.to_string()), None, None)
}

impl WorkflowEngine for LocalWorkflowEngine {
    fn start_execution<'a>(
        &'a self,
        workflow_id: &'a str,
        name: &'a str,
        input: String,
    ) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            let workflow = self.inner.workflows.get(workflow_id).cloned().ok_or_else(|| {
                WorkflowError::ExecutionStart(format!("workflow does not exist: {workflow_id}"))
            })?;
            validate_name(name)?;
            let input: Value = serde_json::from_str(&input)
                .map_err(|e| WorkflowError::ExecutionStart(format!("invalid input JSON: {e}")))?;
            if !input.is_object() {
                return Err(WorkflowError::ExecutionStart(
                    "execution input must be a JSON object".into(),
                ));
            }

            let execution_id = format!("{workflow_id}:{name}");
            let mut map = self.inner.executions.write().await;
            if map.contains_key(&execution_id) {
                return Err(WorkflowError::ExecutionStart(format!(
                    "execution already exists: {execution_id}"
                )));
            }

            map.insert(
                execution_id.clone(),
                ExecutionRecord {
                    description: ExecutionDescription {
                        execution_id: execution_id.clone(),
                        status: ExecutionStatus::Running,
                        output: None,
                        error: None,
                        cause: None,
                    },
                    task: None,
                },
            );

            let inner = Arc::clone(&self.inner);
            let id = execution_id.clone();
            let handle = tokio::spawn(async move {
                let run = run_stages(&workflow.stages, input);
                let (status, output, error, cause) = match workflow.timeout {
                    Some(limit) => match tokio::time::timeout(limit, run).await {
                        Ok(res) => res,
                        Err(_) => (
                            ExecutionStatus::TimedOut,
                            None,
                            Some("States.Timeout".into()),
                            Some(format!("execution exceeded {limit:?}")),
                        ),
                    },
                    None => run.await,
                };

                let mut map = inner.executions.write().await;
                if let Some(rec) = map.get_mut(&id) {
                    if rec.finish(status, output, error, cause) {
                        info!(execution_id = %id, %status, "execution finished");
                    }
                }
            });

            // The task cannot finish before this write lock is released.
            if let Some(rec) = map.get_mut(&execution_id) {
                rec.task = Some(handle.abort_handle());
            }

            info!(execution_id = %execution_id, "execution started");
            Ok(execution_id)
        })
    }

    fn describe_execution<'a>(
        &'a self,
        execution_id: &'a str,
    ) -> BoxFuture<'a, Result<ExecutionDescription>> {
        Box::pin(async move {
            self.inner
                .executions
                .read()
                .await
                .get(execution_id)
                .map(|r| r.description.clone())
                .ok_or_else(|| WorkflowError::ExecutionNotFound(execution_id.to_string()))
        })
    }
}
