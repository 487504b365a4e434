//! Starts one execution and polls it until it ends or the caller gives up.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use services::ids::default_execution_name;
use tracing::{error, info, instrument, warn};

use crate::engine::WorkflowEngine;
use crate::errors::{Result, WorkflowError};
use crate::model::{
    ExecutionHandle, ExecutionOutcome, ExecutionRequest, ExecutionStatus, PollPolicy,
};

pub struct ExecutionOrchestrator {
    engine: Arc<dyn WorkflowEngine>,
    workflow_id: String,
}

impl ExecutionOrchestrator {
    pub fn new(engine: Arc<dyn WorkflowEngine>, workflow_id: impl Into<String>) -> Self {
        Self {
            engine,
            workflow_id: workflow_id.into(),
        }
    }

    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    /// Starts exactly one execution of the configured workflow.
    ///
    /// Without `name`, uses `ecs-trigger-{unix_seconds}`.
    ///
    /// # Errors
    /// [`WorkflowError::ExecutionStart`] if the engine rejects the request.
    #[instrument(skip(self, request), fields(workflow = %self.workflow_id))]
    pub async fn start(
        &self,
        request: &ExecutionRequest,
        name: Option<&str>,
    ) -> Result<ExecutionHandle> {
        let name = name
            .map(str::to_string)
            .unwrap_or_else(|| default_execution_name(Utc::now()));
        let input = serde_json::to_string(request)
            .map_err(|e| WorkflowError::ExecutionStart(format!("encode input: {e}")))?;

        let started_at = Utc::now();
        let started = tokio::time::Instant::now();
        let execution_id = match self
            .engine
            .start_execution(&self.workflow_id, &name, input)
            .await
        {
            Ok(id) => id,
            Err(WorkflowError::ExecutionStart(msg)) => {
                error!(%name, "failed to start execution: {msg}");
                return Err(WorkflowError::ExecutionStart(msg));
            }
            Err(other) => {
                error!(%name, "failed to start execution: {other}");
                return Err(WorkflowError::ExecutionStart(other.to_string()));
            }
        };

        info!(%execution_id, %name, "started execution");
        Ok(ExecutionHandle {
            execution_id,
            name,
            started_at,
            started,
        })
    }

    /// Polls until a terminal status, a failed status query, or `policy.timeout`.
    ///
    /// Never sleeps past the deadline and never polls again after a terminal
    /// status is observed.
    #[instrument(skip(self, handle), fields(execution_id = %handle.execution_id))]
    pub async fn await_completion(
        &self,
        handle: &ExecutionHandle,
        policy: PollPolicy,
    ) -> ExecutionOutcome {
        loop {
            let desc = match self.engine.describe_execution(&handle.execution_id).await {
                Ok(d) => d,
                Err(e) => {
                    error!("status query failed: {e}");
                    return ExecutionOutcome::PollError {
                        message: e.to_string(),
                    };
                }
            };
            info!(status = %desc.status, "execution status");

            match desc.status {
                ExecutionStatus::Succeeded => {
                    let output = desc.output.as_deref().map(parse_output);
                    info!(output = ?output, "execution succeeded");
                    return ExecutionOutcome::Succeeded { output };
                }
                ExecutionStatus::Running => {}
                status => {
                    error!(
                        %status,
                        error = desc.error.as_deref().unwrap_or(""),
                        cause = desc.cause.as_deref().unwrap_or(""),
                        "execution did not succeed"
                    );
                    return ExecutionOutcome::Failed {
                        status,
                        error: desc.error,
                        cause: desc.cause,
                    };
                }
            }

            let elapsed = handle.elapsed();
            if elapsed >= policy.timeout {
                warn!(?elapsed, "poll timeout exceeded; execution still running");
                return ExecutionOutcome::PollTimeoutExceeded { elapsed };
            }
            let remaining = policy.timeout.saturating_sub(elapsed);
            tokio::time::sleep(policy.interval.min(remaining)).await;
        }
    }

    /// `start` followed by `await_completion`.
    pub async fn run(
        &self,
        request: &ExecutionRequest,
        name: Option<&str>,
        policy: PollPolicy,
    ) -> Result<(ExecutionHandle, ExecutionOutcome)> {
        let handle = self.start(request, name).await?;
        let outcome = self.await_completion(&handle, policy).await;
        Ok((handle, outcome))
    }
}

/// Engine output is JSON text; keep it raw if it does not parse.
fn parse_output(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ExecutionDescription;
    use futures::future::BoxFuture;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Replays scripted describe answers; the last one repeats forever.
    struct ScriptedEngine {
        start: std::result::Result<String, String>,
        script: Mutex<VecDeque<std::result::Result<ExecutionDescription, String>>>,
        started_with: Mutex<Option<(String, String, String)>>,
        polls: AtomicUsize,
    }

    impl ScriptedEngine {
        fn new(script: Vec<std::result::Result<ExecutionDescription, String>>) -> Arc<Self> {
            Arc::new(Self {
                start: Ok("exec-1".into()),
                script: Mutex::new(script.into()),
                started_with: Mutex::new(None),
                polls: AtomicUsize::new(0),
            })
        }

        fn rejecting(msg: &str) -> Arc<Self> {
            Arc::new(Self {
                start: Err(msg.into()),
                script: Mutex::new(VecDeque::new()),
                started_with: Mutex::new(None),
                polls: AtomicUsize::new(0),
            })
        }

        fn polls(&self) -> usize {
            self.polls.load(Ordering::SeqCst)
        }
    }

    impl WorkflowEngine for ScriptedEngine {
        fn start_execution<'a>(
            &'a self,
            workflow_id: &'a str,
            name: &'a str,
            input: String,
        ) -> BoxFuture<'a, Result<String>> {
            Box::pin(async move {
                *self.started_with.lock().unwrap() =
                    Some((workflow_id.to_string(), name.to_string(), input));
                self.start.clone().map_err(WorkflowError::ExecutionStart)
            })
        }

        fn describe_execution<'a>(
            &'a self,
            _execution_id: &'a str,
        ) -> BoxFuture<'a, Result<ExecutionDescription>> {
            Box::pin(async move {
                self.polls.fetch_add(1, Ordering::SeqCst);
                let mut script = self.script.lock().unwrap();
                let next = if script.len() > 1 {
                    script.pop_front().unwrap()
                } else {
                    script.front().cloned().unwrap()
                };
                next.map_err(WorkflowError::Poll)
            })
        }
    }

    fn desc(status: ExecutionStatus) -> ExecutionDescription {
        ExecutionDescription {
            execution_id: "exec-1".into(),
            status,
            output: None,
            error: None,
            cause: None,
        }
    }

    fn request() -> ExecutionRequest {
        ExecutionRequest {
            bucket: "bucket".into(),
            file_path: "products.csv".into(),
            embed_columns: vec!["title".into(), "description".into()],
        }
    }

    fn fast() -> PollPolicy {
        PollPolicy {
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(60),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn succeeded_after_running_returns_parsed_output() {
        let mut done = desc(ExecutionStatus::Succeeded);
        done.output = Some(r#"{"statusCode":200,"body":{"indexed_count":2}}"#.into());
        let engine = ScriptedEngine::new(vec![
            Ok(desc(ExecutionStatus::Running)),
            Ok(desc(ExecutionStatus::Running)),
            Ok(done),
        ]);
        let orch = ExecutionOrchestrator::new(engine.clone(), "arn:wf");

        let (handle, outcome) = orch.run(&request(), Some("ecs-run"), fast()).await.unwrap();
        assert_eq!(handle.execution_id, "exec-1");
        assert_eq!(
            outcome,
            ExecutionOutcome::Succeeded {
                output: Some(json!({"statusCode": 200, "body": {"indexed_count": 2}}))
            }
        );
        assert_eq!(engine.polls(), 3);

        let (wf, name, input) = engine.started_with.lock().unwrap().clone().unwrap();
        assert_eq!(wf, "arn:wf");
        assert_eq!(name, "ecs-run");
        let input: Value = serde_json::from_str(&input).unwrap();
        assert_eq!(input["csv_file_path"], "products.csv");
    }

    #[tokio::test(start_paused = true)]
    async fn failed_carries_error_and_cause_and_stops_polling() {
        let mut failed = desc(ExecutionStatus::Failed);
        failed.error = Some("States.TaskFailed".into());
        failed.cause = Some("Embedding service error at row 1: boom".into());
        let engine = ScriptedEngine::new(vec![Ok(failed)]);
        let orch = ExecutionOrchestrator::new(engine.clone(), "arn:wf");

        let handle = orch.start(&request(), None).await.unwrap();
        assert!(handle.name.starts_with("ecs-trigger-"));
        let outcome = orch.await_completion(&handle, fast()).await;

        assert_eq!(
            outcome,
            ExecutionOutcome::Failed {
                status: ExecutionStatus::Failed,
                error: Some("States.TaskFailed".into()),
                cause: Some("Embedding service error at row 1: boom".into()),
            }
        );
        assert_eq!(engine.polls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn engine_timed_out_is_not_a_poll_timeout() {
        let engine = ScriptedEngine::new(vec![
            Ok(desc(ExecutionStatus::Running)),
            Ok(desc(ExecutionStatus::TimedOut)),
        ]);
        let orch = ExecutionOrchestrator::new(engine, "arn:wf");

        let (_, outcome) = orch.run(&request(), None, fast()).await.unwrap();
        assert!(matches!(
            outcome,
            ExecutionOutcome::Failed {
                status: ExecutionStatus::TimedOut,
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn poll_timeout_never_sleeps_past_deadline() {
        let engine = ScriptedEngine::new(vec![Ok(desc(ExecutionStatus::Running))]);
        let orch = ExecutionOrchestrator::new(engine.clone(), "arn:wf");
        let policy = PollPolicy {
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(5),
        };

        let handle = orch.start(&request(), None).await.unwrap();
        let outcome = orch.await_completion(&handle, policy).await;

        match outcome {
            ExecutionOutcome::PollTimeoutExceeded { elapsed } => {
                assert!(elapsed >= Duration::from_secs(5));
                assert!(elapsed < Duration::from_secs(6));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(engine.polls(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn long_interval_is_clamped_to_remaining_time() {
        let engine = ScriptedEngine::new(vec![Ok(desc(ExecutionStatus::Running))]);
        let orch = ExecutionOrchestrator::new(engine.clone(), "arn:wf");
        let policy = PollPolicy {
            interval: Duration::from_secs(30),
            timeout: Duration::from_secs(10),
        };

        let handle = orch.start(&request(), None).await.unwrap();
        let outcome = orch.await_completion(&handle, policy).await;

        match outcome {
            ExecutionOutcome::PollTimeoutExceeded { elapsed } => {
                assert!(elapsed < Duration::from_secs(11));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(engine.polls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn status_query_failure_ends_immediately() {
        let engine = ScriptedEngine::new(vec![Err("throttled".into())]);
        let orch = ExecutionOrchestrator::new(engine.clone(), "arn:wf");

        let (_, outcome) = orch.run(&request(), None, fast()).await.unwrap();
        match outcome {
            ExecutionOutcome::PollError { message } => assert!(message.contains("throttled")),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(engine.polls(), 1);
    }

    #[tokio::test]
    async fn rejected_start_is_an_error_and_nothing_is_polled() {
        let engine = ScriptedEngine::rejecting("workflow does not exist");
        let orch = ExecutionOrchestrator::new(engine.clone(), "arn:missing");

        let err = orch.run(&request(), None, fast()).await.unwrap_err();
        assert!(matches!(err, WorkflowError::ExecutionStart(_)));
        assert_eq!(engine.polls(), 0);
    }

    #[test]
    fn non_json_output_is_kept_as_string() {
        assert_eq!(parse_output("done"), Value::String("done".into()));
        assert_eq!(parse_output("[1]"), json!([1]));
    }
}
