//! Retention engine for containers, images and volumes.
//!
//! Each pass first materializes its candidate list through the `plan_*`
//! methods, then issues removals one by one in that order. A failed removal is
//! logged by the fault wrapper and never stops the pass.

use crate::config::GcConfig;
use crate::container::{
    ContainerSnapshot, ContainerSummary, DaemonApi, ImageSnapshot, ImageSummary, VolumeSnapshot,
};
use crate::env::{LOG_ID_LEN, truncate_id};
use crate::gc::eligibility::{
    ImageUsage, TagCounter, filter_excluded_containers, filter_excluded_images,
    filter_images_in_use, is_image_old, should_remove_container,
};
use crate::gc::fault::api_call;
use crate::gc::{CleanupReport, ResourceReport};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

/// An image selected for removal and the references to remove it by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRemoval {
    pub summary: ImageSummary,
    pub image: ImageSnapshot,
    /// The image id for untagged images, otherwise every repository tag
    pub references: Vec<String>,
}

impl ImageRemoval {
    fn new(summary: ImageSummary, image: ImageSnapshot) -> Self {
        // Removing by id while several tags point at the image is a conflict.
        let references = if summary.is_untagged() {
            vec![summary.id.clone()]
        } else {
            summary.repo_tags.clone()
        };
        Self {
            summary,
            image,
            references,
        }
    }

    /// `id tag, tag` as shown in log lines.
    pub fn describe(&self) -> String {
        format!(
            "{} {}",
            truncate_id(&self.image.id, LOG_ID_LEN),
            self.summary.tags().join(", ")
        )
    }
}

/// Applies a [`GcConfig`] against a daemon.
pub struct GarbageCollector<'a, D: DaemonApi + ?Sized> {
    client: &'a D,
    config: &'a GcConfig,
}

impl<'a, D: DaemonApi + ?Sized> GarbageCollector<'a, D> {
    pub fn new(client: &'a D, config: &'a GcConfig) -> Self {
        Self { client, config }
    }

    /// Run every pass the configuration enables, in order: containers,
    /// images, dangling volumes.
    pub async fn run(&self) -> CleanupReport {
        let mut report = CleanupReport::default();

        if let Some(cutoff) = self.config.max_container_age {
            report.containers = self.cleanup_containers(cutoff).await;
        }

        if self.config.cleans_images() {
            report.images = self.cleanup_images().await;
        }

        if self.config.dangling_volumes {
            report.volumes = self.cleanup_volumes().await;
        }

        report
    }

    async fn get_all_containers(&self) -> Option<Vec<ContainerSummary>> {
        info!("Getting all containers");
        let containers = api_call(
            "list_containers",
            &[("all", "true")],
            self.client.list_containers(true),
        )
        .await?;
        info!("Found {} containers", containers.len());
        Some(containers)
    }

    async fn get_all_images(&self) -> Option<Vec<ImageSummary>> {
        info!("Getting all images");
        let images = api_call("list_images", &[], self.client.list_images()).await?;
        info!("Found {} images", images.len());
        Some(images)
    }

    async fn get_dangling_volumes(&self) -> Option<Vec<VolumeSnapshot>> {
        info!("Getting dangling volumes");
        let volumes = api_call(
            "list_volumes",
            &[("dangling", "true")],
            self.client.list_dangling_volumes(),
        )
        .await?;
        info!("Found {} dangling volumes", volumes.len());
        Some(volumes)
    }

    /// Containers that would be removed, in removal order.
    pub async fn plan_containers(&self, cutoff: DateTime<Utc>) -> Vec<ContainerSnapshot> {
        let Some(containers) = self.get_all_containers().await else {
            return Vec::new();
        };
        let containers =
            filter_excluded_containers(containers, &self.config.exclude_container_labels);

        let mut candidates = Vec::new();
        for summary in containers.iter().rev() {
            let inspected = api_call(
                "inspect_container",
                &[("container", summary.id.as_str())],
                self.client.inspect_container(&summary.id),
            )
            .await;

            let Some(Some(container)) = inspected else {
                continue;
            };
            if should_remove_container(&container, cutoff) {
                candidates.push(container);
            }
        }
        candidates
    }

    pub async fn cleanup_containers(&self, cutoff: DateTime<Utc>) -> ResourceReport {
        let candidates = self.plan_containers(cutoff).await;
        let mut report = ResourceReport::new(candidates.len());

        for container in &candidates {
            info!(
                "Removing container {} {} {}",
                truncate_id(&container.id, LOG_ID_LEN),
                container.name,
                container.finished_display()
            );
            if self.config.dry_run {
                continue;
            }

            let removed = api_call(
                "remove_container",
                &[("container", container.id.as_str()), ("v", "true")],
                self.client.remove_container(&container.id, true),
            )
            .await;
            report.record(removed.is_some());
        }
        report
    }

    /// Images that would be removed, in removal order.
    ///
    /// Returns `None` when the container or image listing failed, since
    /// usage cannot be established without them.
    pub async fn plan_images(&self) -> Option<Vec<ImageRemoval>> {
        // Listed again so containers removed by the container pass no longer
        // keep their images alive.
        let Some(containers) = self.get_all_containers().await else {
            warn!("Skipping image cleanup: container listing failed");
            return None;
        };
        let usage = ImageUsage::from_containers(&containers, self.client.api_version());

        let Some(images) = self.get_all_images().await else {
            warn!("Skipping image cleanup: image listing failed");
            return None;
        };
        let images = filter_images_in_use(images, &usage);
        let images = filter_excluded_images(images, &self.config.exclude_images);

        let mut counter = TagCounter::new(self.config.max_tags_count);
        let mut candidates = Vec::new();
        for summary in images.into_iter().rev() {
            let exceeds_max_tags_count = counter.exceeds(&summary);

            let inspected = api_call(
                "inspect_image",
                &[("image", summary.id.as_str())],
                self.client.inspect_image(&summary.id),
            )
            .await;
            let Some(Some(image)) = inspected else {
                continue;
            };

            if exceeds_max_tags_count || is_image_old(&image, self.config.max_image_age) {
                candidates.push(ImageRemoval::new(summary, image));
            }
        }
        Some(candidates)
    }

    pub async fn cleanup_images(&self) -> ResourceReport {
        let Some(candidates) = self.plan_images().await else {
            return ResourceReport::default();
        };
        let mut report = ResourceReport::new(candidates.len());

        for removal in &candidates {
            info!("Removing image {}", removal.describe());
            if self.config.dry_run {
                continue;
            }

            let mut succeeded = true;
            for reference in &removal.references {
                let removed = api_call(
                    "remove_image",
                    &[("image", reference.as_str())],
                    self.client.remove_image(reference),
                )
                .await;
                succeeded &= removed.is_some();
            }
            report.record(succeeded);
        }
        report
    }

    /// Dangling volumes in removal order.
    pub async fn plan_volumes(&self) -> Vec<VolumeSnapshot> {
        let mut volumes = self.get_dangling_volumes().await.unwrap_or_default();
        volumes.reverse();
        volumes
    }

    pub async fn cleanup_volumes(&self) -> ResourceReport {
        let candidates = self.plan_volumes().await;
        let mut report = ResourceReport::new(candidates.len());

        for volume in &candidates {
            info!("Removing dangling volume {}", volume.name);
            if self.config.dry_run {
                continue;
            }

            let removed = api_call(
                "remove_volume",
                &[("name", volume.name.as_str())],
                self.client.remove_volume(&volume.name),
            )
            .await;
            report.record(removed.is_some());
        }
        report
    }
}
