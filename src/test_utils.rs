//! Test utilities: an in-memory daemon and environment probes.
//!
//! [`FakeDaemon`] implements [`DaemonApi`] over plain vectors, applies
//! removals to its own state and records every call, so tests can assert on
//! exactly which requests an engine issued and in what order.

use crate::container::{
    ApiVersion, ContainerError, ContainerSnapshot, ContainerSummary, DaemonApi, ImageSnapshot,
    ImageSummary, Result, VolumeSnapshot,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::process::Command;
use std::sync::Mutex;

pub fn has_docker() -> bool {
    Command::new("docker")
        .arg("info")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Macro to skip tests when no daemon is reachable
#[macro_export]
macro_rules! require_docker {
    () => {
        if !$crate::test_utils::has_docker() {
            eprintln!("Test ignored: Docker not available");
            return;
        }
    };
}

/// Parse an RFC 3339 fixture timestamp.
pub fn timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .expect("fixture timestamps are RFC 3339")
        .with_timezone(&Utc)
}

/// A request received by [`FakeDaemon`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListContainers(bool),
    InspectContainer(String),
    RemoveContainer(String, bool),
    StopContainer(String),
    ListImages,
    InspectImage(String),
    RemoveImage(String),
    ListDanglingVolumes,
    RemoveVolume(String),
}

impl Call {
    /// Whether the call changes daemon state.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Call::RemoveContainer(..)
                | Call::StopContainer(_)
                | Call::RemoveImage(_)
                | Call::RemoveVolume(_)
        )
    }
}

/// Container fixture.
#[derive(Debug, Clone)]
pub struct FakeContainer {
    snapshot: ContainerSnapshot,
    image_id: Option<String>,
}

/// A stopped container named `name`, finished on 2014-01-01.
pub fn container(id: &str, name: &str) -> FakeContainer {
    FakeContainer {
        snapshot: ContainerSnapshot {
            id: id.to_string(),
            name: name.to_string(),
            image: "busybox:latest".to_string(),
            running: false,
            ghost: false,
            created: timestamp("2013-12-20T17:00:00Z"),
            started_at: Some(timestamp("2014-01-01T17:01:00Z")),
            finished_at: Some(timestamp("2014-01-01T17:30:00Z")),
            labels: HashMap::new(),
        },
        image_id: None,
    }
}

impl FakeContainer {
    pub fn created(mut self, at: &str) -> Self {
        self.snapshot.created = timestamp(at);
        self
    }

    pub fn started(mut self, at: &str) -> Self {
        self.snapshot.started_at = Some(timestamp(at));
        self
    }

    pub fn finished(mut self, at: &str) -> Self {
        self.snapshot.finished_at = Some(timestamp(at));
        self
    }

    pub fn never_started(mut self) -> Self {
        self.snapshot.started_at = None;
        self.snapshot.finished_at = None;
        self
    }

    pub fn running(mut self) -> Self {
        self.snapshot.running = true;
        self.snapshot.finished_at = None;
        self
    }

    pub fn ghost(mut self) -> Self {
        self.snapshot.ghost = true;
        self
    }

    pub fn image(mut self, reference: &str) -> Self {
        self.snapshot.image = reference.to_string();
        self
    }

    pub fn image_id(mut self, id: &str) -> Self {
        self.image_id = Some(id.to_string());
        self
    }

    pub fn label(mut self, key: &str, value: &str) -> Self {
        self.snapshot.labels.insert(key.to_string(), value.to_string());
        self
    }

    fn summary(&self) -> ContainerSummary {
        ContainerSummary {
            id: self.snapshot.id.clone(),
            names: vec![format!("/{}", self.snapshot.name)],
            image: self.snapshot.image.clone(),
            image_id: self.image_id.clone(),
            labels: self.snapshot.labels.clone(),
        }
    }
}

/// Image fixture.
#[derive(Debug, Clone)]
pub struct FakeImage {
    summary: ImageSummary,
}

/// An image created on 2014-01-20; an empty tag list means untagged.
pub fn image(id: &str, tags: &[&str]) -> FakeImage {
    let repo_tags = if tags.is_empty() {
        vec![crate::env::UNTAGGED.to_string()]
    } else {
        tags.iter().map(|t| t.to_string()).collect()
    };

    FakeImage {
        summary: ImageSummary {
            id: id.to_string(),
            repo_tags,
            created: timestamp("2014-01-20T05:00:00Z"),
        },
    }
}

impl FakeImage {
    pub fn created(mut self, at: &str) -> Self {
        self.summary.created = timestamp(at);
        self
    }
}

pub fn volume(name: &str) -> VolumeSnapshot {
    VolumeSnapshot {
        name: name.to_string(),
        driver: "local".to_string(),
        mountpoint: format!("/var/lib/docker/volumes/{}/_data", name),
        labels: HashMap::new(),
    }
}

#[derive(Default)]
struct FakeState {
    containers: Vec<FakeContainer>,
    images: Vec<FakeImage>,
    volumes: Vec<VolumeSnapshot>,
    calls: Vec<Call>,
    vanished: HashSet<String>,
    failures: HashMap<String, ContainerError>,
    listing_fails: bool,
}

impl FakeState {
    fn take_failure(&mut self, key: &str) -> Result<()> {
        match self.failures.remove(key) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn check_listing(&self) -> Result<()> {
        if self.listing_fails {
            return Err(ContainerError::Timeout("listing timed out".into()));
        }
        Ok(())
    }
}

/// In-memory daemon for engine tests.
pub struct FakeDaemon {
    api_version: ApiVersion,
    state: Mutex<FakeState>,
}

impl Default for FakeDaemon {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeDaemon {
    pub fn new() -> Self {
        Self {
            api_version: ApiVersion::new(1, 41),
            state: Mutex::new(FakeState::default()),
        }
    }

    pub fn with_api_version(mut self, version: ApiVersion) -> Self {
        self.api_version = version;
        self
    }

    fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_container(&self, container: FakeContainer) {
        self.state().containers.push(container);
    }

    pub fn add_image(&self, image: FakeImage) {
        self.state().images.push(image);
    }

    pub fn add_volume(&self, volume: VolumeSnapshot) {
        self.state().volumes.push(volume);
    }

    /// Keep `id` in listings but report it missing on inspect, as if another
    /// actor removed it in between.
    pub fn vanish(&self, id: &str) {
        self.state().vanished.insert(id.to_string());
    }

    /// Fail the next mutating call on `key` (container id, image reference or
    /// volume name) with `err`.
    pub fn fail_removal(&self, key: &str, err: ContainerError) {
        self.state().failures.insert(key.to_string(), err);
    }

    /// Fail every listing call.
    pub fn fail_listing(&self) {
        self.state().listing_fails = true;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    /// Removal and stop calls, in the order they were issued.
    pub fn removals(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    pub fn container_ids(&self) -> Vec<String> {
        self.state()
            .containers
            .iter()
            .map(|c| c.snapshot.id.clone())
            .collect()
    }

    pub fn image_ids(&self) -> Vec<String> {
        self.state()
            .images
            .iter()
            .map(|i| i.summary.id.clone())
            .collect()
    }

    pub fn volume_names(&self) -> Vec<String> {
        self.state().volumes.iter().map(|v| v.name.clone()).collect()
    }

    pub fn is_running(&self, id: &str) -> bool {
        self.state()
            .containers
            .iter()
            .any(|c| c.snapshot.id == id && c.snapshot.running)
    }
}

#[async_trait]
impl DaemonApi for FakeDaemon {
    fn api_version(&self) -> ApiVersion {
        self.api_version
    }

    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerSummary>> {
        let mut state = self.state();
        state.calls.push(Call::ListContainers(all));
        state.check_listing()?;
        Ok(state
            .containers
            .iter()
            .filter(|c| all || c.snapshot.running)
            .map(FakeContainer::summary)
            .collect())
    }

    async fn inspect_container(&self, id: &str) -> Result<Option<ContainerSnapshot>> {
        let mut state = self.state();
        state.calls.push(Call::InspectContainer(id.to_string()));
        if state.vanished.contains(id) {
            return Ok(None);
        }
        Ok(state
            .containers
            .iter()
            .find(|c| c.snapshot.id == id)
            .map(|c| c.snapshot.clone()))
    }

    async fn remove_container(&self, id: &str, volumes: bool) -> Result<()> {
        let mut state = self.state();
        state
            .calls
            .push(Call::RemoveContainer(id.to_string(), volumes));
        state.take_failure(id)?;

        let before = state.containers.len();
        state.containers.retain(|c| c.snapshot.id != id);
        if state.containers.len() == before {
            return Err(ContainerError::NotFound(format!("No such container: {}", id)));
        }
        Ok(())
    }

    async fn stop_container(&self, id: &str) -> Result<()> {
        let mut state = self.state();
        state.calls.push(Call::StopContainer(id.to_string()));
        state.take_failure(id)?;

        let container = state
            .containers
            .iter_mut()
            .find(|c| c.snapshot.id == id)
            .ok_or_else(|| ContainerError::NotFound(format!("No such container: {}", id)))?;
        container.snapshot.running = false;
        container.snapshot.finished_at = Some(Utc::now());
        Ok(())
    }

    async fn list_images(&self) -> Result<Vec<ImageSummary>> {
        let mut state = self.state();
        state.calls.push(Call::ListImages);
        state.check_listing()?;
        Ok(state.images.iter().map(|i| i.summary.clone()).collect())
    }

    async fn inspect_image(&self, id: &str) -> Result<Option<ImageSnapshot>> {
        let mut state = self.state();
        state.calls.push(Call::InspectImage(id.to_string()));
        if state.vanished.contains(id) {
            return Ok(None);
        }
        Ok(state
            .images
            .iter()
            .find(|i| i.summary.id == id)
            .map(|i| ImageSnapshot {
                id: i.summary.id.clone(),
                repo_tags: i.summary.repo_tags.clone(),
                created: i.summary.created,
            }))
    }

    async fn remove_image(&self, reference: &str) -> Result<()> {
        let mut state = self.state();
        state.calls.push(Call::RemoveImage(reference.to_string()));
        state.take_failure(reference)?;

        let position = state.images.iter().position(|i| {
            i.summary.id == reference || i.summary.repo_tags.iter().any(|t| t == reference)
        });
        let Some(position) = position else {
            return Err(ContainerError::NotFound(format!("No such image: {}", reference)));
        };

        let image = &mut state.images[position];
        if image.summary.id == reference {
            if image.summary.tags().len() > 1 {
                return Err(ContainerError::Status {
                    status: 409,
                    message: format!("conflict: unable to delete {} (must be forced)", reference),
                });
            }
            state.images.remove(position);
            return Ok(());
        }

        image.summary.repo_tags.retain(|t| t != reference);
        if image.summary.repo_tags.is_empty() {
            state.images.remove(position);
        }
        Ok(())
    }

    async fn list_dangling_volumes(&self) -> Result<Vec<VolumeSnapshot>> {
        let mut state = self.state();
        state.calls.push(Call::ListDanglingVolumes);
        state.check_listing()?;
        Ok(state.volumes.clone())
    }

    async fn remove_volume(&self, name: &str) -> Result<()> {
        let mut state = self.state();
        state.calls.push(Call::RemoveVolume(name.to_string()));
        state.take_failure(name)?;

        let before = state.volumes.len();
        state.volumes.retain(|v| v.name != name);
        if state.volumes.len() == before {
            return Err(ContainerError::NotFound(format!("No such volume: {}", name)));
        }
        Ok(())
    }
}
