//! Tesharvest Pipeline
//!
//! Composes the client, the metrics extractor and the store into one harvest run.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     HarvestPipeline                         │
//! │  - run(mode, cancel) → HarvestSummary                       │
//! │  - "all": list COMPLETE ids, bounded concurrent fan-out     │
//! │  - single id: the same per-task path for one id             │
//! └─────────────────────────────────────────────────────────────┘
//!          │                    │                      │
//!          ▼                    ▼                      ▼
//!   TesClient            MetricsExtractor          Store
//!   - list / fetch       - skip rules, probes      - one append per run
//! ```
//!
//! Per-task problems (not ready, skipped, failed) are counted and never stop
//! the run. Listing failures, store failures and cancellation abort it before
//! anything is written.

mod error;
mod events;
mod mode;
mod outcome;
mod pipeline;

pub use error::{InvalidTarget, PipelineError, TaskError};
pub use events::{ChannelNotifier, HarvestEvent, HarvestNotifier, NoopNotifier};
pub use mode::HarvestMode;
pub use outcome::{HarvestSummary, TaskOutcome};
pub use pipeline::HarvestPipeline;
