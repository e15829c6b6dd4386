use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use tesharvest_config::{Credentials, HarvestConfig, RetryPolicy};
use tesharvest_pipeline::{HarvestMode, HarvestPipeline};

/// tesharvest - Register completed TES task metrics as HPCAdvisor data points
#[derive(Parser)]
#[command(name = "tesharvest")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Task id to harvest, or "all" for every COMPLETE task
  target: String,

  /// TES tasks endpoint, e.g. https://tes.example.com/v1/tasks/
  #[arg(long, env = "TES_URL")]
  tes_url: String,

  /// TES basic-auth user
  #[arg(long, env = "TES_USER")]
  tes_user: String,

  /// TES basic-auth password
  #[arg(long, env = "TES_PASSWORD", hide_env_values = true)]
  tes_password: String,

  /// Deployment label written into each data point (default: unknown)
  #[arg(long, env = "HPCADVISOR_DEPLOYMENT")]
  deployment: Option<String>,

  /// Existing HPCAdvisor data point store to append to
  #[arg(long, env = "HPCADVISOR_DATAPOINTS")]
  store: PathBuf,

  /// Tasks processed concurrently in "all" mode
  #[arg(long, default_value_t = HarvestConfig::DEFAULT_TASK_CONCURRENCY)]
  concurrency: usize,

  /// Input size probes in flight per task
  #[arg(long, default_value_t = HarvestConfig::DEFAULT_PROBE_CONCURRENCY)]
  probe_concurrency: usize,

  /// Per-request timeout in seconds
  #[arg(long, default_value_t = 30)]
  timeout_secs: u64,

  /// Retries for transient request failures
  #[arg(long, default_value_t = 3)]
  max_retries: u32,
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  init_tracing();

  let config = build_config(&cli)?;
  let mode: HarvestMode = cli
    .target
    .parse()
    .context("failed to parse harvest target")?;

  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async { run(config, mode).await })
}

fn init_tracing() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .init();
}

fn build_config(cli: &Cli) -> Result<HarvestConfig> {
  let retry = RetryPolicy {
    max_retries: cli.max_retries,
    ..RetryPolicy::default()
  };

  let config = HarvestConfig::new(
    &cli.tes_url,
    Credentials::new(&cli.tes_user, &cli.tes_password),
    &cli.store,
  )
  .context("invalid configuration")?
  .with_deployment(cli.deployment.clone())
  .with_retry(retry)
  .with_request_timeout(Duration::from_secs(cli.timeout_secs))
  .context("invalid --timeout-secs")?
  .with_task_concurrency(cli.concurrency)
  .context("invalid --concurrency")?
  .with_probe_concurrency(cli.probe_concurrency)
  .context("invalid --probe-concurrency")?;

  Ok(config)
}

async fn run(config: HarvestConfig, mode: HarvestMode) -> Result<()> {
  let pipeline = HarvestPipeline::new(&config).context("failed to create harvest pipeline")?;

  let cancel = CancellationToken::new();
  let ctrl_c = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      warn!("interrupt received, cancelling harvest");
      ctrl_c.cancel();
    }
  });

  eprintln!("Harvesting {} from {}", mode, config.base_url);

  let summary = pipeline
    .run(mode, cancel)
    .await
    .with_context(|| format!("harvest into {} failed", config.store_path.display()))?;

  eprintln!("Harvest completed: {}", summary);

  Ok(())
}
