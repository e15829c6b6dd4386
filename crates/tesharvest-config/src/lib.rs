//! Tesharvest Config
//!
//! This crate contains the configuration value consumed by every harvester
//! component. A [`HarvestConfig`] is built once at the process boundary (CLI
//! flags and environment) and handed down explicitly; nothing below the
//! binary reads process state.

mod config;
mod error;
mod retry;

pub use config::{Credentials, DEFAULT_DEPLOYMENT, HarvestConfig};
pub use error::ConfigError;
pub use retry::{RetryBackoff, RetryPolicy};
