//! # Custodian
//!
//! Retention tooling for a container runtime daemon. Two command line tools
//! share this library:
//!
//! - **`dcgc`**: removes stopped containers older than a cutoff, unused images
//!   older than a cutoff or beyond a per-repository tag quota, and dangling
//!   volumes.
//! - **`dcstop`**: stops running containers, selected by name or image prefix,
//!   that have been running longer than a maximum run time.
//!
//! ## Architecture Overview
//!
//! - **[`cli`]**: argument parsing, durations, exclude lists and the policy file
//! - **[`config`]**: validated run configuration and daemon connection settings
//! - **[`container`]**: the [`DaemonApi`] seam, typed snapshots and the bollard client
//! - **[`gc`]**: eligibility rules, matchers and the [`GarbageCollector`] engine
//! - **[`autostop`]**: the [`ContainerStopper`] engine
//!
//! Every remote call made by the engines goes through a fault wrapper that
//! logs timeouts and API errors and moves on to the next item, so a single
//! run never aborts halfway through.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use custodian::{ClientConfig, ContainerClient, GarbageCollector, GcConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let client = ContainerClient::connect(&ClientConfig::from_env(60)?).await?;
//!     let config = GcConfig {
//!         max_tags_count: Some(3),
//!         dry_run: true,
//!         ..Default::default()
//!     };
//!
//!     let report = GarbageCollector::new(&client, &config).run().await;
//!     println!("{}", report);
//!     Ok(())
//! }
//! ```

/// Stopping long-running containers.
pub mod autostop;

/// Command line parsing shared by both binaries.
pub mod cli;

/// Validated configuration for the engines and the daemon connection.
pub mod config;

/// Daemon interface, snapshots and client.
pub mod container;

/// Environment variable names and shared constants.
pub mod env;

/// Garbage collection of containers, images and volumes.
pub mod gc;

pub mod test_utils;

pub use autostop::ContainerStopper;
pub use config::{ArgumentError, ClientConfig, GcConfig, StopConfig};
#[cfg(feature = "containers")]
pub use container::ContainerClient;
pub use container::{ContainerError, DaemonApi};
pub use gc::{CleanupReport, GarbageCollector, ResourceReport};
