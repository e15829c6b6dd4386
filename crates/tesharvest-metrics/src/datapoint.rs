use serde::{Deserialize, Serialize};

/// Producer tag written into every data point's `appname`.
pub const APP_NAME: &str = "tes";

/// TES tasks always run on a single node.
pub const NODE_COUNT: u32 = 1;

/// One normalized HPCAdvisor record derived from a completed task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
  pub deployment: String,
  pub appname: String,
  pub total_cores: u32,
  pub sku: String,
  pub nnodes: u32,
  pub appinputs: AppInputs,
  /// Wall-clock seconds of the first executor run.
  pub exec_time: f64,
  pub tags: DataPointTags,
}

/// Shape of the task's inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppInputs {
  pub num_sequences: usize,
  /// Byte sizes, positionally aligned with the task's declared inputs.
  pub sequence_sizes: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPointTags {
  /// Source task id, for tracing a data point back to the TES.
  pub tes_experiment_id: String,
}
