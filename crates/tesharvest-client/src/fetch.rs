use tracing::{debug, instrument};

use crate::client::TesClient;
use crate::error::ClientError;
use crate::types::{TaskRecord, TaskState};

/// Result of fetching one task that the TES answered successfully.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
  /// The task reached COMPLETE; its full record is attached.
  Complete(Box<TaskRecord>),
  /// The task exists but is in some other state.
  NotReady(TaskState),
}

impl TesClient {
  /// Fetch the FULL view of `task_id`.
  ///
  /// Only a successful response whose `state` is COMPLETE yields a record. Any
  /// other state is [`FetchOutcome::NotReady`], which is not an error.
  #[instrument(name = "fetch_task", skip(self))]
  pub async fn fetch_task(&self, task_id: &str) -> Result<FetchOutcome, ClientError> {
    let url = self.task_url(task_id)?;
    let response = self.get(&url, &[("view", "FULL")]).await?;
    let record: TaskRecord = self.read_json(response).await?;
    debug!(state = %record.state, "fetched task");

    if record.state == TaskState::Complete {
      Ok(FetchOutcome::Complete(Box::new(record)))
    } else {
      Ok(FetchOutcome::NotReady(record.state))
    }
  }
}

#[cfg(test)]
mod tests {
  use mockito::Matcher;
  use tesharvest_config::{Credentials, HarvestConfig, RetryPolicy};

  use super::*;

  fn client_for(server: &mockito::Server) -> TesClient {
    let config = HarvestConfig::new(
      &format!("{}/v1/tasks", server.url()),
      Credentials::new("user", "pass"),
      "store.json",
    )
    .unwrap()
    .with_retry(RetryPolicy::none());
    TesClient::new(&config).unwrap()
  }

  #[tokio::test]
  async fn test_complete_task_returns_record() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("GET", "/v1/tasks/task-1")
      .match_query(Matcher::UrlEncoded("view".into(), "FULL".into()))
      .match_header("authorization", Matcher::Regex("^Basic ".into()))
      .with_status(200)
      .with_body(r#"{"id": "task-1", "state": "COMPLETE", "resources": {"cpu_cores": 2}}"#)
      .create_async()
      .await;

    let outcome = client_for(&server).fetch_task("task-1").await.unwrap();

    match outcome {
      FetchOutcome::Complete(record) => {
        assert_eq!(record.id, "task-1");
        assert_eq!(record.resources.unwrap().cpu_cores, Some(2));
      }
      other => panic!("expected complete task, got {:?}", other),
    }
    mock.assert_async().await;
  }

  #[tokio::test]
  async fn test_non_authoritative_success_is_decoded() {
    let mut server = mockito::Server::new_async().await;
    server
      .mock("GET", "/v1/tasks/task-3")
      .match_query(Matcher::UrlEncoded("view".into(), "FULL".into()))
      .with_status(203)
      .with_body(r#"{"id": "task-3", "state": "COMPLETE"}"#)
      .create_async()
      .await;

    let outcome = client_for(&server).fetch_task("task-3").await.unwrap();

    assert!(matches!(outcome, FetchOutcome::Complete(record) if record.id == "task-3"));
  }

  #[tokio::test]
  async fn test_task_id_with_reserved_characters_stays_on_endpoint() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("GET", "/v1/tasks/job:42%2Fa")
      .match_query(Matcher::UrlEncoded("view".into(), "FULL".into()))
      .with_status(200)
      .with_body(r#"{"id": "job:42/a", "state": "RUNNING"}"#)
      .create_async()
      .await;

    let outcome = client_for(&server).fetch_task("job:42/a").await.unwrap();

    assert!(matches!(outcome, FetchOutcome::NotReady(TaskState::Running)));
    mock.assert_async().await;
  }

  #[tokio::test]
  async fn test_running_task_is_not_ready() {
    let mut server = mockito::Server::new_async().await;
    server
      .mock("GET", "/v1/tasks/task-2")
      .match_query(Matcher::UrlEncoded("view".into(), "FULL".into()))
      .with_status(200)
      .with_body(r#"{"id": "task-2", "state": "RUNNING"}"#)
      .create_async()
      .await;

    let outcome = client_for(&server).fetch_task("task-2").await.unwrap();

    assert!(matches!(outcome, FetchOutcome::NotReady(TaskState::Running)));
  }

  #[tokio::test]
  async fn test_not_found_carries_status_and_body() {
    let mut server = mockito::Server::new_async().await;
    server
      .mock("GET", "/v1/tasks/missing")
      .match_query(Matcher::Any)
      .with_status(404)
      .with_body("no such task")
      .create_async()
      .await;

    let err = client_for(&server).fetch_task("missing").await.unwrap_err();

    match err {
      ClientError::Status { status, body } => {
        assert_eq!(status, 404);
        assert_eq!(body, "no such task");
      }
      other => panic!("expected status error, got {:?}", other),
    }
  }

  #[tokio::test]
  async fn test_unreachable_server_is_http_error() {
    let config = HarvestConfig::new(
      "http://127.0.0.1:1/v1/tasks/",
      Credentials::new("user", "pass"),
      "store.json",
    )
    .unwrap()
    .with_retry(RetryPolicy::none());
    let client = TesClient::new(&config).unwrap();

    let err = client.fetch_task("task-1").await.unwrap_err();

    assert!(matches!(err, ClientError::Http(_)));
  }
}
