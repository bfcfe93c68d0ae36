//! Typed snapshots of daemon objects.
//!
//! Every run fetches fresh snapshots; nothing here is persisted or mutated
//! after construction. Optional daemon fields become `Option`s, and the
//! daemon's "zero" timestamp sentinel becomes `None`.

use crate::container::{ContainerError, Result};
use crate::env::{SHORT_ID_LEN, UNTAGGED, YEAR_ZERO, truncate_id};
use chrono::{DateTime, Datelike, TimeZone, Utc};
use std::collections::HashMap;

/// Entry from the container listing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContainerSummary {
    pub id: String,
    /// Names as reported by the daemon, each with a leading `/`
    pub names: Vec<String>,
    /// Image reference the container was created from
    pub image: String,
    /// Immutable image id, reported from API 1.21 onwards
    pub image_id: Option<String>,
    pub labels: HashMap<String, String>,
}

/// Full inspection result for a single container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSnapshot {
    pub id: String,
    /// Container name without the leading `/`
    pub name: String,
    /// Image reference from the container configuration
    pub image: String,
    pub running: bool,
    /// Orphaned container reported by the daemon
    pub ghost: bool,
    pub created: DateTime<Utc>,
    /// `None` when the container was never started
    pub started_at: Option<DateTime<Utc>>,
    /// `None` when the container never finished
    pub finished_at: Option<DateTime<Utc>>,
    pub labels: HashMap<String, String>,
}

/// Logical lifecycle state used by the container eligibility rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Running,
    Ghost,
    NeverStarted { created: DateTime<Utc> },
    Finished { at: DateTime<Utc> },
}

impl ContainerSnapshot {
    pub fn state(&self) -> LifecycleState {
        if self.running {
            LifecycleState::Running
        } else if self.ghost {
            LifecycleState::Ghost
        } else {
            match self.finished_at {
                None => LifecycleState::NeverStarted {
                    created: self.created,
                },
                Some(at) => LifecycleState::Finished { at },
            }
        }
    }

    /// Finish timestamp as the daemon would print it.
    pub fn finished_display(&self) -> String {
        self.finished_at
            .map(|at| at.to_rfc3339())
            .unwrap_or_else(|| YEAR_ZERO.to_string())
    }
}

/// Entry from the image listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSummary {
    pub id: String,
    pub repo_tags: Vec<String>,
    pub created: DateTime<Utc>,
}

impl ImageSummary {
    /// Whether the image carries no real repository tag.
    pub fn is_untagged(&self) -> bool {
        no_image_tags(&self.repo_tags)
    }

    /// Real repository tags, empty for untagged images.
    pub fn tags(&self) -> &[String] {
        if self.is_untagged() {
            &[]
        } else {
            &self.repo_tags
        }
    }

    /// Reference strings a container listing may use for this image.
    ///
    /// Untagged images are referenced by their short id with a `latest` tag.
    pub fn reference_set(&self) -> Vec<String> {
        if self.is_untagged() {
            vec![format!("{}:latest", short_id(&self.id))]
        } else {
            self.repo_tags.clone()
        }
    }
}

/// Full inspection result for a single image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSnapshot {
    pub id: String,
    pub repo_tags: Vec<String>,
    pub created: DateTime<Utc>,
}

/// Entry from the volume listing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VolumeSnapshot {
    pub name: String,
    pub driver: String,
    pub mountpoint: String,
    pub labels: HashMap<String, String>,
}

/// True for an empty tag list or the daemon's `<none>:<none>` placeholder.
pub fn no_image_tags(tags: &[String]) -> bool {
    tags.is_empty() || (tags.len() == 1 && tags[0] == UNTAGGED)
}

/// Repository part of a tag: everything before the last `:`.
pub fn repository_of(tag: &str) -> &str {
    tag.rsplit_once(':').map(|(repo, _)| repo).unwrap_or("")
}

/// Id without its digest algorithm prefix, cut to the daemon's short form.
pub fn short_id(id: &str) -> &str {
    let bare = id.strip_prefix("sha256:").unwrap_or(id);
    truncate_id(bare, SHORT_ID_LEN)
}

/// Parse a daemon timestamp, mapping the zero sentinel to `None`.
pub fn parse_timestamp(value: &str) -> Result<Option<DateTime<Utc>>> {
    if value.is_empty() || value == YEAR_ZERO {
        return Ok(None);
    }

    let parsed = DateTime::parse_from_rfc3339(value)
        .map_err(|e| ContainerError::InvalidResponse(format!("bad timestamp '{}': {}", value, e)))?
        .with_timezone(&Utc);

    if parsed.year() <= 1 {
        return Ok(None);
    }
    Ok(Some(parsed))
}

/// Parse a timestamp that must be present.
pub fn parse_required_timestamp(value: &str, field: &str) -> Result<DateTime<Utc>> {
    parse_timestamp(value)?
        .ok_or_else(|| ContainerError::InvalidResponse(format!("missing {}", field)))
}

/// Convert listing epoch seconds to a timestamp.
pub fn from_epoch_seconds(seconds: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_opt(seconds, 0)
        .single()
        .ok_or_else(|| ContainerError::InvalidResponse(format!("bad epoch {}", seconds)))
}

#[cfg(feature = "containers")]
mod convert {
    use super::*;
    use bollard::models::{
        ContainerInspectResponse, ContainerSummary as ApiContainerSummary, ImageInspect,
        ImageSummary as ApiImageSummary, Volume,
    };

    impl From<ApiContainerSummary> for ContainerSummary {
        fn from(summary: ApiContainerSummary) -> Self {
            Self {
                id: summary.id.unwrap_or_default(),
                names: summary.names.unwrap_or_default(),
                image: summary.image.unwrap_or_default(),
                image_id: summary.image_id.filter(|id| !id.is_empty()),
                labels: summary.labels.unwrap_or_default(),
            }
        }
    }

    impl TryFrom<ContainerInspectResponse> for ContainerSnapshot {
        type Error = ContainerError;

        fn try_from(inspect: ContainerInspectResponse) -> Result<Self> {
            let id = inspect
                .id
                .ok_or_else(|| ContainerError::InvalidResponse("container has no id".into()))?;
            let state = inspect.state.unwrap_or_default();
            let config = inspect.config.unwrap_or_default();

            Ok(Self {
                name: inspect
                    .name
                    .unwrap_or_default()
                    .trim_start_matches('/')
                    .to_string(),
                image: config.image.unwrap_or_default(),
                running: state.running.unwrap_or(false),
                ghost: state.dead.unwrap_or(false),
                created: parse_required_timestamp(
                    inspect.created.as_deref().unwrap_or_default(),
                    "Created",
                )?,
                started_at: parse_timestamp(state.started_at.as_deref().unwrap_or_default())?,
                finished_at: parse_timestamp(state.finished_at.as_deref().unwrap_or_default())?,
                labels: config.labels.unwrap_or_default(),
                id,
            })
        }
    }

    impl TryFrom<ApiImageSummary> for ImageSummary {
        type Error = ContainerError;

        fn try_from(summary: ApiImageSummary) -> Result<Self> {
            Ok(Self {
                created: from_epoch_seconds(summary.created)?,
                id: summary.id,
                repo_tags: summary.repo_tags,
            })
        }
    }

    impl TryFrom<ImageInspect> for ImageSnapshot {
        type Error = ContainerError;

        fn try_from(inspect: ImageInspect) -> Result<Self> {
            let id = inspect
                .id
                .ok_or_else(|| ContainerError::InvalidResponse("image has no id".into()))?;

            Ok(Self {
                created: parse_required_timestamp(
                    inspect.created.as_deref().unwrap_or_default(),
                    "Created",
                )?,
                repo_tags: inspect.repo_tags.unwrap_or_default(),
                id,
            })
        }
    }

    impl From<Volume> for VolumeSnapshot {
        fn from(volume: Volume) -> Self {
            Self {
                name: volume.name,
                driver: volume.driver,
                mountpoint: volume.mountpoint,
                labels: volume.labels,
            }
        }
    }
}
