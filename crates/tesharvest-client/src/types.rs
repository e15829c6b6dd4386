use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a TES task.
///
/// States this client does not recognise decode as [`TaskState::Unknown`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
  Queued,
  Initializing,
  Running,
  Paused,
  Complete,
  ExecutorError,
  SystemError,
  Canceled,
  Canceling,
  Preempted,
  #[default]
  #[serde(other)]
  Unknown,
}

impl TaskState {
  pub fn as_str(&self) -> &'static str {
    match self {
      TaskState::Unknown => "UNKNOWN",
      TaskState::Queued => "QUEUED",
      TaskState::Initializing => "INITIALIZING",
      TaskState::Running => "RUNNING",
      TaskState::Paused => "PAUSED",
      TaskState::Complete => "COMPLETE",
      TaskState::ExecutorError => "EXECUTOR_ERROR",
      TaskState::SystemError => "SYSTEM_ERROR",
      TaskState::Canceled => "CANCELED",
      TaskState::Canceling => "CANCELING",
      TaskState::Preempted => "PREEMPTED",
    }
  }
}

impl fmt::Display for TaskState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// One page of `GET /tasks`.
#[derive(Debug, Clone, Deserialize)]
pub struct ListTasksResponse {
  #[serde(default)]
  pub tasks: Vec<TaskSummary>,
  #[serde(default)]
  pub next_page_token: Option<String>,
}

/// Minimal task entry returned by the listing endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskSummary {
  pub id: String,
  #[serde(default)]
  pub state: TaskState,
}

/// Full view of a task as returned by `GET /tasks/{id}?view=FULL`.
///
/// Only the fields the harvester reads are modelled; everything else is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskRecord {
  pub id: String,
  #[serde(default)]
  pub state: TaskState,
  #[serde(default)]
  pub resources: Option<Resources>,
  #[serde(default, deserialize_with = "null_as_empty")]
  pub inputs: Vec<TaskInput>,
  #[serde(default, deserialize_with = "null_as_empty")]
  pub logs: Vec<TaskLog>,
}

impl TaskRecord {
  /// Backend parameters, if the task declares any.
  pub fn backend_parameters(&self) -> Option<&BackendParameters> {
    self
      .resources
      .as_ref()
      .and_then(|r| r.backend_parameters.as_ref())
  }

  /// The first executor log entry of the first log group.
  pub fn first_executor_log(&self) -> Option<&ExecutorLog> {
    self.logs.first().and_then(|group| group.logs.first())
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Resources {
  #[serde(default)]
  pub cpu_cores: Option<u32>,
  #[serde(default)]
  pub backend_parameters: Option<BackendParameters>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendParameters {
  #[serde(default)]
  pub vm_size: Option<String>,
}

/// A declared task input. Either `url` or inline `content` is normally set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskInput {
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub url: Option<String>,
  #[serde(default)]
  pub content: Option<String>,
}

/// One attempt's worth of logs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskLog {
  #[serde(default, deserialize_with = "null_as_empty")]
  pub logs: Vec<ExecutorLog>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecutorLog {
  #[serde(default)]
  pub start_time: Option<String>,
  #[serde(default)]
  pub end_time: Option<String>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
  D: serde::Deserializer<'de>,
  T: Deserialize<'de>,
{
  Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_unrecognised_state_is_unknown() {
    let summary: TaskSummary =
      serde_json::from_str(r#"{"id": "t1", "state": "SOMETHING_NEW"}"#).unwrap();
    assert_eq!(summary.state, TaskState::Unknown);
  }

  #[test]
  fn test_every_listed_state_decodes() {
    for state in ["QUEUED", "COMPLETE", "EXECUTOR_ERROR", "PREEMPTED", "UNKNOWN"] {
      let decoded: TaskState = serde_json::from_value(serde_json::json!(state)).unwrap();
      assert_eq!(decoded.as_str(), state);
    }
  }

  #[test]
  fn test_task_record_full_view() {
    let record: TaskRecord = serde_json::from_str(
      r#"{
        "id": "task-1",
        "state": "COMPLETE",
        "name": "ignored",
        "resources": {
          "cpu_cores": 4,
          "backend_parameters": {"vm_size": "Standard_D4s_v3", "workflow_execution_identity": "x"}
        },
        "inputs": [{"name": "reads", "url": "https://blob/a.fq", "path": "/data/a.fq"}],
        "logs": [{"logs": [{"start_time": "2024-01-01T00:00:00.000000Z", "end_time": "2024-01-01T00:00:05.500000Z"}]}]
      }"#,
    )
    .unwrap();

    assert_eq!(record.state, TaskState::Complete);
    assert_eq!(record.resources.as_ref().unwrap().cpu_cores, Some(4));
    assert_eq!(
      record.backend_parameters().unwrap().vm_size.as_deref(),
      Some("Standard_D4s_v3")
    );
    assert_eq!(record.inputs.len(), 1);
    assert_eq!(
      record.first_executor_log().unwrap().end_time.as_deref(),
      Some("2024-01-01T00:00:05.500000Z")
    );
  }

  #[test]
  fn test_null_collections_decode_empty() {
    let record: TaskRecord =
      serde_json::from_str(r#"{"id": "t", "state": "RUNNING", "inputs": null, "logs": null}"#)
        .unwrap();
    assert!(record.inputs.is_empty());
    assert!(record.logs.is_empty());
    assert!(record.backend_parameters().is_none());
  }

  #[test]
  fn test_listing_without_token() {
    let page: ListTasksResponse =
      serde_json::from_str(r#"{"tasks": [{"id": "a", "state": "COMPLETE"}]}"#).unwrap();
    assert_eq!(page.tasks.len(), 1);
    assert!(page.next_page_token.is_none());
  }
}
