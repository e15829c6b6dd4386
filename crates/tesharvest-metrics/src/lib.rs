//! Tesharvest Metrics
//!
//! Turns a COMPLETE TES [`TaskRecord`](tesharvest_client::TaskRecord) into an
//! HPCAdvisor [`DataPoint`].
//!
//! Extraction has three outcomes: a data point, an explicit [`Extraction::Skipped`]
//! for tasks that carry nothing worth recording, or an [`ExtractError`] for
//! records whose data is inconsistent. Input sizes come from a [`SizeProbe`];
//! [`HttpSizeProbe`] issues `HEAD` requests and degrades to `0` on any failure.

mod datapoint;
mod error;
mod extract;
mod probe;
mod timing;

pub use datapoint::{APP_NAME, AppInputs, DataPoint, DataPointTags, NODE_COUNT};
pub use error::ExtractError;
pub use extract::{Extraction, MetricsExtractor, SkipReason};
pub use probe::{HttpSizeProbe, SizeProbe, content_length};
pub use timing::{exec_time_seconds, parse_timestamp};
