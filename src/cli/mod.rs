//! Command line surface shared by the `dcgc` and `dcstop` binaries
//!
//! This module contains argument parsing, duration and exclude-list
//! handling, and the optional TOML policy file.

pub mod args;
pub mod config;
pub mod duration;
pub mod exclude;

pub use args::{GcArgs, GcOptions, StopArgs};
pub use config::FileConfig;
pub use duration::{DurationParseError, parse_duration, timedelta_type};
pub use exclude::build_exclude_set;

use crate::env::DEFAULT_LOG_FILTER;
use tracing_subscriber::EnvFilter;

/// Plain message lines on stdout, filtered by `RUST_LOG` when set.
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stdout)
        .without_time()
        .with_level(false)
        .with_target(false)
        .init();
}
