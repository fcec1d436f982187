//! Asynchronous task tracking
//!
//! Mutating CloudAPI calls may answer 202 with a `Location` pointing at a
//! task under `/api/task/{id}`. The task is polled until it settles.

use super::client::{Client, TenantContext};
use super::error::ApiError;
use serde::Deserialize;
use tfplug::Context;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub status: String,
    #[serde(default)]
    pub operation: Option<String>,
    #[serde(default)]
    pub owner: Option<TaskOwner>,
    #[serde(default)]
    pub error: Option<TaskError>,
}

/// Entity the task operated on
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskOwner {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub owner_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskError {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub minor_error_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskState {
    Running,
    Success,
    Failed(String),
}

impl Task {
    pub fn state(&self) -> TaskState {
        match self.status.as_str() {
            "success" => TaskState::Success,
            "error" | "aborted" => {
                let message = self
                    .error
                    .as_ref()
                    .map(|e| e.message.clone())
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| format!("task ended with status '{}'", self.status));
                TaskState::Failed(message)
            }
            _ => TaskState::Running,
        }
    }

    fn label(&self) -> String {
        match &self.operation {
            Some(operation) if !operation.is_empty() => operation.clone(),
            _ if !self.name.is_empty() => self.name.clone(),
            _ => self.id.clone(),
        }
    }
}

impl Client {
    /// Polls `href` until the task succeeds, fails, the provider is stopped,
    /// or `max_retry_timeout` elapses
    pub async fn wait_for_task(
        &self,
        ctx: &Context,
        href: &str,
        tenant: Option<&TenantContext>,
    ) -> Result<Task, ApiError> {
        let timeout = self.max_retry_timeout();

        tokio::select! {
            biased;
            _ = ctx.cancelled() => Err(ApiError::Cancelled),
            result = tokio::time::timeout(timeout, self.poll_task(href, tenant)) => {
                result.unwrap_or_else(|_| Err(ApiError::Timeout(timeout.as_secs())))
            }
        }
    }

    async fn poll_task(&self, href: &str, tenant: Option<&TenantContext>) -> Result<Task, ApiError> {
        loop {
            let task: Task = self.get_legacy(href, tenant).await?;
            match task.state() {
                TaskState::Success => return Ok(task),
                TaskState::Failed(message) => {
                    return Err(ApiError::Task {
                        task: task.label(),
                        message,
                    })
                }
                TaskState::Running => {
                    tracing::debug!("task {} is {}, polling again", task.id, task.status);
                    tokio::time::sleep(self.task_poll_interval()).await;
                }
            }
        }
    }
}
