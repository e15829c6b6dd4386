//! End-to-end harvest runs against a mock TES and a temporary store file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use mockito::{Matcher, Mock, Server};
use serde_json::{Value, json};
use tesharvest_client::TesClient;
use tesharvest_config::{Credentials, HarvestConfig, RetryPolicy};
use tesharvest_metrics::SizeProbe;
use tesharvest_pipeline::{
  ChannelNotifier, HarvestEvent, HarvestMode, HarvestPipeline, NoopNotifier, PipelineError,
};
use tesharvest_store::JsonFileStore;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Size probe answering from a fixed table; unknown URLs are 0.
struct TableProbe(HashMap<String, u64>);

#[async_trait]
impl SizeProbe for TableProbe {
  async fn probe_size(&self, url: &str) -> u64 {
    self.0.get(url).copied().unwrap_or(0)
  }
}

fn probe() -> TableProbe {
  TableProbe(HashMap::from([
    ("https://blob/r1.fq".to_string(), 1024),
    ("https://blob/r2.fq".to_string(), 2048),
  ]))
}

fn config(server: &Server, store: &Path) -> HarvestConfig {
  HarvestConfig::new(
    &format!("{}/v1/tasks/", server.url()),
    Credentials::new("harvester", "hunter2"),
    store,
  )
  .unwrap()
  .with_deployment(Some("eastus".to_string()))
  .with_retry(RetryPolicy::none())
  .with_task_concurrency(3)
  .unwrap()
}

fn store_file(content: &str) -> (tempfile::TempDir, PathBuf) {
  let dir = tempfile::tempdir().expect("should create temp dir");
  let path = dir.path().join("datapoints.json");
  std::fs::write(&path, content).expect("should write store");
  (dir, path)
}

fn read_store(path: &Path) -> Value {
  serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

fn complete_task(id: &str, vm_size: &str, seconds: u32) -> Value {
  json!({
    "id": id,
    "state": "COMPLETE",
    "resources": {"cpu_cores": 4, "backend_parameters": {"vm_size": vm_size}},
    "inputs": [
      {"name": "r1", "url": "https://blob/r1.fq"},
      {"name": "r2", "url": "https://blob/r2.fq"}
    ],
    "logs": [{"logs": [{
      "start_time": "2024-01-01T00:00:00.000000Z",
      "end_time": format!("2024-01-01T00:00:{:02}.000000Z", seconds)
    }]}]
  })
}

async fn mock_detail(server: &mut Server, id: &str, status: usize, body: Value) -> Mock {
  server
    .mock("GET", format!("/v1/tasks/{}", id).as_str())
    .match_query(Matcher::UrlEncoded("view".into(), "FULL".into()))
    .with_status(status)
    .with_body(body.to_string())
    .create_async()
    .await
}

async fn mock_page(server: &mut Server, token: &str, body: Value) -> Mock {
  server
    .mock("GET", "/v1/tasks/")
    .match_query(Matcher::UrlEncoded("page_token".into(), token.into()))
    .with_status(200)
    .with_body(body.to_string())
    .create_async()
    .await
}

#[tokio::test]
async fn test_all_mode_harvests_in_listing_order() {
  let mut server = Server::new_async().await;
  let (_dir, store) = store_file(r#"{"datapoints": [{"legacy": true}]}"#);

  mock_page(
    &mut server,
    "",
    json!({
      "tasks": [
        {"id": "t1", "state": "COMPLETE"},
        {"id": "queued", "state": "QUEUED"},
        {"id": "t2", "state": "COMPLETE"},
        {"id": "t3", "state": "COMPLETE"}
      ],
      "next_page_token": "page-2"
    }),
  )
  .await;
  mock_page(
    &mut server,
    "page-2",
    json!({"tasks": [{"id": "t4", "state": "COMPLETE"}, {"id": "t5", "state": "COMPLETE"}]}),
  )
  .await;

  mock_detail(&mut server, "t1", 200, complete_task("t1", "Standard_D4s_v3", 7)).await;
  mock_detail(&mut server, "t2", 500, json!({"error": "boom"})).await;
  let mut no_inputs = complete_task("t3", "Standard_D4s_v3", 3);
  no_inputs["inputs"] = json!([]);
  mock_detail(&mut server, "t3", 200, no_inputs).await;
  mock_detail(&mut server, "t4", 200, json!({"id": "t4", "state": "RUNNING"})).await;
  mock_detail(&mut server, "t5", 200, complete_task("t5", "Standard_E8s_v5", 12)).await;

  let config = config(&server, &store);
  let (tx, mut rx) = mpsc::unbounded_channel();
  let pipeline = HarvestPipeline::from_parts(
    &config,
    TesClient::new(&config).unwrap(),
    probe(),
    JsonFileStore::new(&store),
    NoopNotifier,
  )
  .with_notifier(ChannelNotifier::new(tx));

  let summary = pipeline
    .run(HarvestMode::All, CancellationToken::new())
    .await
    .expect("harvest should succeed");

  assert_eq!(summary.listed, 5);
  assert_eq!(summary.harvested, 2);
  assert_eq!(summary.failed, 1);
  assert_eq!(summary.skipped, 1);
  assert_eq!(summary.not_ready, 1);
  assert_eq!(summary.appended, 2);
  assert_eq!(summary.store_total, 3);

  let document = read_store(&store);
  let points = document["datapoints"].as_array().unwrap();
  assert_eq!(points.len(), 3);
  assert_eq!(points[0], json!({"legacy": true}));
  assert_eq!(
    points[1],
    json!({
      "deployment": "eastus",
      "appname": "tes",
      "total_cores": 4,
      "sku": "Standard_D4s_v3",
      "nnodes": 1,
      "appinputs": {"num_sequences": 2, "sequence_sizes": [1024, 2048]},
      "exec_time": 7.0,
      "tags": {"tes_experiment_id": "t1"}
    })
  );
  assert_eq!(points[2]["tags"]["tes_experiment_id"], "t5");
  assert_eq!(points[2]["sku"], "Standard_E8s_v5");
  assert_eq!(points[2]["exec_time"], 12.0);

  drop(pipeline);
  let mut events = Vec::new();
  while let Some(event) = rx.recv().await {
    events.push(event);
  }
  assert_eq!(events.first(), Some(&HarvestEvent::TasksListed { count: 5 }));
  assert_eq!(
    events.last(),
    Some(&HarvestEvent::StoreUpdated {
      appended: 2,
      total: 3
    })
  );
  assert!(events.iter().any(|e| matches!(
    e,
    HarvestEvent::TaskFailed { task_id, .. } if task_id == "t2"
  )));
  assert!(events.iter().any(|e| matches!(
    e,
    HarvestEvent::TaskNotReady { task_id, state } if task_id == "t4" && state == "RUNNING"
  )));
}

#[tokio::test]
async fn test_single_running_task_writes_nothing() {
  let mut server = Server::new_async().await;
  let original = r#"{"datapoints": []}"#;
  let (_dir, store) = store_file(original);
  let detail = mock_detail(
    &mut server,
    "in-flight",
    200,
    json!({"id": "in-flight", "state": "RUNNING"}),
  )
  .await;

  let config = config(&server, &store);
  let pipeline = HarvestPipeline::from_parts(
    &config,
    TesClient::new(&config).unwrap(),
    probe(),
    JsonFileStore::new(&store),
    NoopNotifier,
  );

  let summary = pipeline
    .run(
      HarvestMode::Single("in-flight".to_string()),
      CancellationToken::new(),
    )
    .await
    .unwrap();

  assert_eq!(summary.listed, 1);
  assert_eq!(summary.not_ready, 1);
  assert_eq!(summary.appended, 0);
  assert_eq!(std::fs::read_to_string(&store).unwrap(), original);
  detail.assert_async().await;
}

#[tokio::test]
async fn test_single_complete_task_is_appended() {
  let mut server = Server::new_async().await;
  let (_dir, store) = store_file(r#"{"datapoints": []}"#);
  mock_detail(&mut server, "t9", 200, complete_task("t9", "Standard_F2s_v2", 5)).await;

  let config = config(&server, &store);
  let pipeline = HarvestPipeline::from_parts(
    &config,
    TesClient::new(&config).unwrap(),
    probe(),
    JsonFileStore::new(&store),
    NoopNotifier,
  );

  let summary = pipeline
    .run("t9".parse().unwrap(), CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(summary.harvested, 1);
  let document = read_store(&store);
  assert_eq!(document["datapoints"][0]["tags"]["tes_experiment_id"], "t9");
  assert_eq!(document["datapoints"][0]["sku"], "Standard_F2s_v2");
}

#[tokio::test]
async fn test_listing_failure_aborts_without_writing() {
  let mut server = Server::new_async().await;
  let original = r#"{"datapoints": []}"#;
  let (_dir, store) = store_file(original);
  server
    .mock("GET", "/v1/tasks/")
    .match_query(Matcher::Any)
    .with_status(403)
    .with_body("forbidden")
    .create_async()
    .await;

  let config = config(&server, &store);
  let pipeline = HarvestPipeline::from_parts(
    &config,
    TesClient::new(&config).unwrap(),
    probe(),
    JsonFileStore::new(&store),
    NoopNotifier,
  );

  let err = pipeline
    .run(HarvestMode::All, CancellationToken::new())
    .await
    .unwrap_err();

  assert!(matches!(err, PipelineError::Listing(_)));
  assert_eq!(std::fs::read_to_string(&store).unwrap(), original);
}

#[tokio::test]
async fn test_missing_store_fails_before_any_request() {
  let mut server = Server::new_async().await;
  let listing = server
    .mock("GET", "/v1/tasks/")
    .match_query(Matcher::Any)
    .expect(0)
    .create_async()
    .await;
  let dir = tempfile::tempdir().unwrap();
  let store = dir.path().join("not-provisioned.json");

  let config = config(&server, &store);
  let pipeline = HarvestPipeline::from_parts(
    &config,
    TesClient::new(&config).unwrap(),
    probe(),
    JsonFileStore::new(&store),
    NoopNotifier,
  );

  let err = pipeline
    .run(HarvestMode::All, CancellationToken::new())
    .await
    .unwrap_err();

  assert!(matches!(
    err,
    PipelineError::Store(tesharvest_store::Error::Missing(_))
  ));
  assert!(!store.exists());
  listing.assert_async().await;
}

#[tokio::test]
async fn test_cancelled_run_writes_nothing() {
  let mut server = Server::new_async().await;
  let original = r#"{"datapoints": []}"#;
  let (_dir, store) = store_file(original);
  mock_page(
    &mut server,
    "",
    json!({"tasks": [{"id": "t1", "state": "COMPLETE"}]}),
  )
  .await;
  mock_detail(&mut server, "t1", 200, complete_task("t1", "Standard_D4s_v3", 7)).await;

  let config = config(&server, &store);
  let pipeline = HarvestPipeline::from_parts(
    &config,
    TesClient::new(&config).unwrap(),
    probe(),
    JsonFileStore::new(&store),
    NoopNotifier,
  );

  let cancel = CancellationToken::new();
  cancel.cancel();
  let err = pipeline.run(HarvestMode::All, cancel).await.unwrap_err();

  assert!(matches!(err, PipelineError::Cancelled));
  assert_eq!(std::fs::read_to_string(&store).unwrap(), original);
}
