//! Bollard-backed daemon client.
//!
//! Connects with the endpoint, TLS material and API version from a
//! [`ClientConfig`], and maps daemon responses onto the typed snapshots in
//! [`crate::container::snapshot`].

use crate::config::{ApiVersionSetting, ClientConfig};
use crate::container::{
    ApiVersion, ContainerError, ContainerSnapshot, ContainerSummary, DaemonApi, ImageSnapshot,
    ImageSummary, Result, VolumeSnapshot,
};
use async_trait::async_trait;
use bollard::query_parameters::{
    InspectContainerOptions, ListContainersOptions, ListImagesOptions, ListVolumesOptions,
    RemoveContainerOptions, RemoveImageOptions, RemoveVolumeOptions, StopContainerOptions,
};
use bollard::{ClientVersion, Docker};
use std::collections::HashMap;
use tracing::debug;

/// Daemon API client.
#[derive(Clone)]
pub struct ContainerClient {
    docker: Docker,
    api_version: ApiVersion,
}

impl ContainerClient {
    /// Connect to the daemon described by `config` and verify it responds.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::Connection`] if the endpoint is unsupported,
    /// the TLS material cannot be loaded, or the daemon does not answer a ping.
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        let requested = match config.api_version {
            ApiVersionSetting::Fixed(version) => ClientVersion {
                major_version: version.major,
                minor_version: version.minor,
            },
            ApiVersionSetting::Auto => bollard::API_DEFAULT_VERSION.clone(),
        };

        let docker = Self::connect_endpoint(config, &requested)?;
        let docker = match config.api_version {
            ApiVersionSetting::Auto => docker
                .negotiate_version()
                .await
                .map_err(|e| ContainerError::Connection(format!("version negotiation: {}", e)))?,
            ApiVersionSetting::Fixed(_) => docker,
        };

        let negotiated = docker.client_version();
        let client = Self {
            docker,
            api_version: ApiVersion::new(negotiated.major_version, negotiated.minor_version),
        };

        client.ping().await?;
        debug!(
            "Connected to {} using API version {}",
            config.host, client.api_version
        );
        Ok(client)
    }

    fn connect_endpoint(config: &ClientConfig, version: &ClientVersion) -> Result<Docker> {
        let host = config.host.as_str();
        let connected = if host.starts_with("unix://") || host.starts_with('/') {
            Docker::connect_with_socket(host, config.timeout, version)
        } else if ["tcp://", "http://", "https://"]
            .iter()
            .any(|scheme| host.starts_with(scheme))
        {
            match &config.tls {
                Some(tls) => Docker::connect_with_ssl(
                    host,
                    &tls.key,
                    &tls.cert,
                    &tls.ca,
                    config.timeout,
                    version,
                ),
                None => Docker::connect_with_http(host, config.timeout, version),
            }
        } else {
            return Err(ContainerError::Connection(format!(
                "unsupported daemon endpoint '{}'",
                host
            )));
        };

        connected.map_err(|e| ContainerError::Connection(format!("{}: {}", host, e)))
    }

    /// Ping the daemon to verify connectivity.
    ///
    /// # Errors
    ///
    /// Returns error if ping fails.
    pub async fn ping(&self) -> Result<()> {
        self.docker
            .ping()
            .await
            .map_err(|e| ContainerError::Connection(format!("failed to ping daemon: {}", e)))?;
        debug!("Daemon ping successful");
        Ok(())
    }
}

/// Treat a missing object as absent rather than as a failure.
fn found<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(ContainerError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

#[async_trait]
impl DaemonApi for ContainerClient {
    fn api_version(&self) -> ApiVersion {
        self.api_version
    }

    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerSummary>> {
        let containers = self
            .docker
            .list_containers(Some(ListContainersOptions {
                all,
                ..Default::default()
            }))
            .await?;
        Ok(containers.into_iter().map(ContainerSummary::from).collect())
    }

    async fn inspect_container(&self, id: &str) -> Result<Option<ContainerSnapshot>> {
        let inspected = self
            .docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await
            .map_err(ContainerError::from);
        found(inspected)?.map(ContainerSnapshot::try_from).transpose()
    }

    async fn remove_container(&self, id: &str, volumes: bool) -> Result<()> {
        self.docker
            .remove_container(
                id,
                Some(RemoveContainerOptions {
                    v: volumes,
                    ..Default::default()
                }),
            )
            .await?;
        Ok(())
    }

    async fn stop_container(&self, id: &str) -> Result<()> {
        self.docker
            .stop_container(id, None::<StopContainerOptions>)
            .await?;
        Ok(())
    }

    async fn list_images(&self) -> Result<Vec<ImageSummary>> {
        let images = self
            .docker
            .list_images(Some(ListImagesOptions::default()))
            .await?;
        images.into_iter().map(ImageSummary::try_from).collect()
    }

    async fn inspect_image(&self, id: &str) -> Result<Option<ImageSnapshot>> {
        let inspected = self
            .docker
            .inspect_image(id)
            .await
            .map_err(ContainerError::from);
        found(inspected)?.map(ImageSnapshot::try_from).transpose()
    }

    async fn remove_image(&self, reference: &str) -> Result<()> {
        self.docker
            .remove_image(reference, None::<RemoveImageOptions>, None)
            .await?;
        Ok(())
    }

    async fn list_dangling_volumes(&self) -> Result<Vec<VolumeSnapshot>> {
        let filters = HashMap::from([("dangling".to_string(), vec!["true".to_string()])]);
        let response = self
            .docker
            .list_volumes(Some(ListVolumesOptions {
                filters: Some(filters),
                ..Default::default()
            }))
            .await?;
        Ok(response
            .volumes
            .unwrap_or_default()
            .into_iter()
            .map(VolumeSnapshot::from)
            .collect())
    }

    async fn remove_volume(&self, name: &str) -> Result<()> {
        self.docker
            .remove_volume(name, None::<RemoveVolumeOptions>)
            .await?;
        Ok(())
    }
}
