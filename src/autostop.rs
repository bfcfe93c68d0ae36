//! Stop containers that have been running for too long.
//!
//! Only running containers are considered. A container is stopped when it
//! matches the configured name or image prefixes and started before the
//! cutoff.

use crate::config::StopConfig;
use crate::container::{ContainerSnapshot, DaemonApi};
use crate::env::{LOG_ID_LEN, truncate_id};
use crate::gc::ResourceReport;
use crate::gc::eligibility::has_been_running_since;
use crate::gc::fault::api_call;
use tracing::info;

/// Applies a [`StopConfig`] against a daemon.
pub struct ContainerStopper<'a, D: DaemonApi + ?Sized> {
    client: &'a D,
    config: &'a StopConfig,
}

impl<'a, D: DaemonApi + ?Sized> ContainerStopper<'a, D> {
    pub fn new(client: &'a D, config: &'a StopConfig) -> Self {
        Self { client, config }
    }

    /// Running containers that would be stopped, in listing order.
    pub async fn plan(&self) -> Vec<ContainerSnapshot> {
        info!("Getting running containers");
        let Some(containers) = api_call(
            "list_containers",
            &[("all", "false")],
            self.client.list_containers(false),
        )
        .await
        else {
            return Vec::new();
        };
        info!("Found {} running containers", containers.len());

        let mut candidates = Vec::new();
        for summary in &containers {
            let inspected = api_call(
                "inspect_container",
                &[("container", summary.id.as_str())],
                self.client.inspect_container(&summary.id),
            )
            .await;
            let Some(Some(container)) = inspected else {
                continue;
            };

            if self.config.matcher.matches(&container)
                && has_been_running_since(&container, self.config.max_run_time)
            {
                candidates.push(container);
            }
        }
        candidates
    }

    pub async fn stop_containers(&self) -> ResourceReport {
        let candidates = self.plan().await;
        let mut report = ResourceReport::new(candidates.len());

        for container in &candidates {
            info!(
                "Stopping container {} {} ({}): running since {}",
                truncate_id(&container.id, LOG_ID_LEN),
                container.name,
                container.image,
                container
                    .started_at
                    .map(|at| at.to_rfc3339())
                    .unwrap_or_default()
            );
            if self.config.dry_run {
                continue;
            }

            let stopped = api_call(
                "stop_container",
                &[("container", container.id.as_str())],
                self.client.stop_container(&container.id),
            )
            .await;
            report.record(stopped.is_some());
        }
        report
    }
}
