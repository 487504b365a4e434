//! Workflow engine capability and the stage contract it executes.

use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::errors::Result;
use crate::model::ExecutionDescription;

/// An opaque state machine host: start executions and query them.
pub trait WorkflowEngine: Send + Sync {
    /// Starts `workflow_id` with the JSON text `input`; returns the execution id.
    fn start_execution<'a>(
        &'a self,
        workflow_id: &'a str,
        name: &'a str,
        input: String,
    ) -> BoxFuture<'a, Result<String>>;

    fn describe_execution<'a>(
        &'a self,
        execution_id: &'a str,
    ) -> BoxFuture<'a, Result<ExecutionDescription>>;
}

impl<T: WorkflowEngine + ?Sized> WorkflowEngine for Arc<T> {
    fn start_execution<'a>(
        &'a self,
        workflow_id: &'a str,
        name: &'a str,
        input: String,
    ) -> BoxFuture<'a, Result<String>> {
        (**self).start_execution(workflow_id, name, input)
    }

    fn describe_execution<'a>(
        &'a self,
        execution_id: &'a str,
    ) -> BoxFuture<'a, Result<ExecutionDescription>> {
        (**self).describe_execution(execution_id)
    }
}

/// Response envelope every stage returns: `{"statusCode": .., "body": ..}`.
///
/// A stage never fails across the engine boundary; failures are a non-200
/// status with `body = {"error": message}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StageResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: Value,
}

impl StageResponse {
    pub fn ok(body: Value) -> Self {
        Self {
            status_code: 200,
            body,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status_code: 500,
            body: json!({ "error": message.into() }),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status_code == 200
    }

    /// The `body.error` text of a failed response, or the raw body.
    pub fn error_message(&self) -> String {
        self.body
            .get("error")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| self.body.to_string())
    }
}

/// One step of a workflow. Receives the previous step's full response (or the
/// execution input for the first step).
pub trait Stage: Send + Sync {
    fn name(&self) -> &str;

    fn invoke(&self, input: Value) -> BoxFuture<'_, StageResponse>;
}
