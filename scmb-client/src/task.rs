//! Asynchronous appliance tasks and bounded polling.

use std::time::Duration;

use serde::Deserialize;

use crate::api::ApiClient;
use crate::error::ProvisionError;

/// Fixed delay between task status polls.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Maximum number of status polls before giving up.
pub const POLL_LIMIT: u32 = 60;

/// A server-side task tracked by polling until terminal.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub uri: String,
    pub task_state: TaskState,
    #[serde(default)]
    pub task_errors: Vec<TaskError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskError {
    #[serde(default)]
    pub message: String,
}

/// Lifecycle state of an appliance task.
///
/// `Warning` is terminal but benign: the task finished with a diagnostic,
/// not a failure. States added by future appliance versions deserialize as
/// `Unknown` and count as non-terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum TaskState {
    New,
    Pending,
    Running,
    Suspended,
    Stopped,
    Completed,
    Warning,
    Error,
    Terminated,
    Killed,
    #[serde(other)]
    Unknown,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Warning | Self::Error | Self::Terminated | Self::Killed
        )
    }

    /// Terminal failure states. Excludes the benign `Warning`.
    pub fn is_error(self) -> bool {
        matches!(self, Self::Error | Self::Terminated | Self::Killed)
    }
}

impl Task {
    /// First error message attached to the task, if any.
    pub fn first_error_message(&self) -> String {
        self.task_errors
            .first()
            .map(|e| e.message.clone())
            .unwrap_or_else(|| "unknown task error".to_string())
    }
}

/// Poll `task` until it reaches a terminal state, then fetch the final
/// record once more by its URI.
pub async fn wait_for_task(api: &ApiClient, task: Task) -> Result<Task, ProvisionError> {
    wait_for_task_with(api, task, POLL_INTERVAL, POLL_LIMIT).await
}

/// [`wait_for_task`] with an explicit interval and poll bound.
pub async fn wait_for_task_with(
    api: &ApiClient,
    mut task: Task,
    interval: Duration,
    limit: u32,
) -> Result<Task, ProvisionError> {
    let mut polls = 0;
    while !task.task_state.is_terminal() {
        if polls == limit {
            return Err(ProvisionError::Timeout { polls });
        }
        tokio::time::sleep(interval).await;
        task = api.get_json(&task.uri).await?;
        polls += 1;
    }
    tracing::debug!(uri = %task.uri, state = ?task.task_state, polls, "task reached terminal state");
    Ok(api.get_json(&task.uri).await?)
}
