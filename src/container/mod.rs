//! Container runtime daemon interface.
//!
//! The engines only talk to the daemon through [`DaemonApi`], a narrow
//! interface returning typed snapshots. The bollard-backed implementation
//! lives in [`client`] and is compiled with the `containers` feature.
//!
//! ## Components
//!
//! - [`snapshot`]: typed container, image and volume records
//! - [`version`]: daemon API version parsing and feature thresholds
//! - `client`: bollard connection from environment settings

#[cfg(feature = "containers")]
mod client;
pub mod snapshot;
pub mod version;

#[cfg(feature = "containers")]
pub use client::ContainerClient;
pub use snapshot::{
    ContainerSnapshot, ContainerSummary, ImageSnapshot, ImageSummary, LifecycleState,
    VolumeSnapshot,
};
pub use version::ApiVersion;

use async_trait::async_trait;

/// Container runtime errors.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    /// Client-side API error (transport, decoding)
    #[cfg(feature = "containers")]
    #[error("{0}")]
    Api(bollard::errors::Error),

    /// Remote call exceeded the configured HTTP timeout
    #[error("timed out: {0}")]
    Timeout(String),

    /// Daemon reported the resource does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Daemon rejected the call with a status code
    #[error("{status} {message}")]
    Status { status: u16, message: String },

    /// Could not connect to the daemon
    #[error("connection error: {0}")]
    Connection(String),

    /// Daemon response was missing or malformed
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ContainerError {
    /// Timeouts are transient; everything else is a remote API failure.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ContainerError::Timeout(_))
    }
}

#[cfg(feature = "containers")]
impl From<bollard::errors::Error> for ContainerError {
    fn from(err: bollard::errors::Error) -> Self {
        match err {
            bollard::errors::Error::RequestTimeoutError => {
                ContainerError::Timeout("request timed out".to_string())
            }
            bollard::errors::Error::DockerResponseServerError {
                status_code: 404,
                message,
            } => ContainerError::NotFound(message),
            bollard::errors::Error::DockerResponseServerError {
                status_code,
                message,
            } => ContainerError::Status {
                status: status_code,
                message,
            },
            other => ContainerError::Api(other),
        }
    }
}

/// Result type for daemon operations.
pub type Result<T> = std::result::Result<T, ContainerError>;

/// Operations the custodian engines need from the daemon.
///
/// Inspect calls return `Ok(None)` when the object no longer exists.
#[async_trait]
pub trait DaemonApi: Send + Sync {
    /// API version in effect for this connection.
    fn api_version(&self) -> ApiVersion;

    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerSummary>>;

    async fn inspect_container(&self, id: &str) -> Result<Option<ContainerSnapshot>>;

    /// Remove a container, together with its anonymous volumes when `volumes` is set.
    async fn remove_container(&self, id: &str, volumes: bool) -> Result<()>;

    async fn stop_container(&self, id: &str) -> Result<()>;

    async fn list_images(&self) -> Result<Vec<ImageSummary>>;

    async fn inspect_image(&self, id: &str) -> Result<Option<ImageSnapshot>>;

    /// Remove an image by id or by a single repository tag.
    async fn remove_image(&self, reference: &str) -> Result<()>;

    /// Volumes the daemon reports as not attached to any container.
    async fn list_dangling_volumes(&self) -> Result<Vec<VolumeSnapshot>>;

    async fn remove_volume(&self, name: &str) -> Result<()>;
}
