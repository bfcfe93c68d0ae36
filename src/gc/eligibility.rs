//! Removal eligibility rules.
//!
//! Every function here is a pure decision over a snapshot and policy values.
//! The only state is [`TagCounter`], which accumulates per-repository tag
//! counts across one traversal.

use crate::container::{
    ApiVersion, ContainerSnapshot, ContainerSummary, ImageSnapshot, ImageSummary, LifecycleState,
};
use crate::container::snapshot::repository_of;
use crate::gc::matcher::{ImageExclusion, LabelMatcher};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

/// Whether a container may be removed given the age cutoff.
///
/// Running containers are never eligible and ghost containers always are.
/// Containers that never ran are judged by creation time, the rest by the
/// time they finished.
pub fn should_remove_container(container: &ContainerSnapshot, min_date: DateTime<Utc>) -> bool {
    match container.state() {
        LifecycleState::Running => false,
        LifecycleState::Ghost => true,
        LifecycleState::NeverStarted { created } => created < min_date,
        LifecycleState::Finished { at } => at < min_date,
    }
}

/// Whether a running container started before the cutoff.
pub fn has_been_running_since(container: &ContainerSnapshot, min_date: DateTime<Utc>) -> bool {
    container
        .started_at
        .map(|started| started < min_date)
        .unwrap_or(false)
}

pub fn is_image_old(image: &ImageSnapshot, min_date: Option<DateTime<Utc>>) -> bool {
    min_date.is_some_and(|min_date| image.created < min_date)
}

/// Per-repository tag quota tracking for one traversal.
#[derive(Debug, Clone, Default)]
pub struct TagCounter {
    max_tags_count: Option<usize>,
    counts: HashMap<String, usize>,
}

impl TagCounter {
    pub fn new(max_tags_count: Option<usize>) -> Self {
        Self {
            max_tags_count,
            counts: HashMap::new(),
        }
    }

    /// Count the image's tags and report whether every one of them lands
    /// beyond its repository's quota.
    ///
    /// Each tag increments its repository once, whether or not the image turns
    /// out to be eligible. Untagged images are never counted.
    pub fn exceeds(&mut self, image: &ImageSummary) -> bool {
        let Some(max) = self.max_tags_count else {
            return false;
        };
        let tags = image.tags();
        if tags.is_empty() {
            return false;
        }

        let mut exceeds = true;
        for tag in tags {
            let count = self
                .counts
                .entry(repository_of(tag).to_string())
                .or_insert(0);
            *count += 1;
            if *count <= max {
                exceeds = false;
            }
        }
        exceeds
    }

    pub fn count(&self, repository: &str) -> usize {
        self.counts.get(repository).copied().unwrap_or(0)
    }
}

/// Images referenced by existing containers.
#[derive(Debug, Clone, Default)]
pub struct ImageUsage {
    ids: HashSet<String>,
    references: HashSet<String>,
}

impl ImageUsage {
    /// Collect usage from a container listing.
    ///
    /// From API 1.21 the listing's immutable image id is used; containers
    /// without one fall back to the image reference they were created from.
    pub fn from_containers(containers: &[ContainerSummary], api_version: ApiVersion) -> Self {
        let mut usage = ImageUsage::default();
        for container in containers {
            match &container.image_id {
                Some(id) if api_version.reports_image_id() => {
                    usage.ids.insert(id.clone());
                }
                _ => {
                    usage.references.insert(container.image.clone());
                }
            }
        }
        usage
    }

    pub fn in_use(&self, image: &ImageSummary) -> bool {
        self.ids.contains(&image.id)
            || image
                .reference_set()
                .iter()
                .any(|reference| self.references.contains(reference))
    }
}

pub fn filter_images_in_use(images: Vec<ImageSummary>, usage: &ImageUsage) -> Vec<ImageSummary> {
    images
        .into_iter()
        .filter(|image| !usage.in_use(image))
        .collect()
}

pub fn filter_excluded_images(
    images: Vec<ImageSummary>,
    exclusion: &ImageExclusion,
) -> Vec<ImageSummary> {
    images
        .into_iter()
        .filter(|image| !exclusion.excludes(image))
        .collect()
}

pub fn filter_excluded_containers(
    containers: Vec<ContainerSummary>,
    exclusion: &LabelMatcher,
) -> Vec<ContainerSummary> {
    containers
        .into_iter()
        .filter(|container| !exclusion.matches(&container.labels))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn now() -> DateTime<Utc> {
        ts(2014, 1, 20, 10, 10)
    }

    fn container() -> ContainerSnapshot {
        ContainerSnapshot {
            id: "abcdabcdabcdabcd".into(),
            name: "container_name".into(),
            image: "docker.io/test/image:1234".into(),
            running: false,
            ghost: false,
            created: ts(2013, 12, 20, 17, 0),
            started_at: Some(ts(2014, 1, 1, 17, 1)),
            finished_at: Some(ts(2014, 1, 1, 17, 30)),
            labels: HashMap::new(),
        }
    }

    fn image_summary(id: &str, tags: &[&str]) -> ImageSummary {
        ImageSummary {
            id: id.into(),
            repo_tags: tags.iter().map(|t| t.to_string()).collect(),
            created: ts(2014, 1, 1, 1, 1),
        }
    }

    #[test]
    fn test_is_running() {
        let c = ContainerSnapshot {
            running: true,
            ghost: true,
            finished_at: Some(ts(2000, 1, 1, 0, 0)),
            ..container()
        };
        assert!(!should_remove_container(&c, now()));
    }

    #[test]
    fn test_is_ghost() {
        let c = ContainerSnapshot {
            ghost: true,
            finished_at: Some(ts(2014, 1, 21, 0, 0)),
            ..container()
        };
        assert!(should_remove_container(&c, now()));
    }

    #[test]
    fn test_old_never_run() {
        let c = ContainerSnapshot {
            created: ts(2014, 1, 1, 0, 0),
            finished_at: None,
            ..container()
        };
        assert!(should_remove_container(&c, now()));
    }

    #[test]
    fn test_not_old_never_run() {
        let c = ContainerSnapshot {
            created: now(),
            finished_at: None,
            ..container()
        };
        assert!(!should_remove_container(&c, now()));
    }

    #[test]
    fn test_old_stopped() {
        assert!(should_remove_container(&container(), now()));
    }

    #[test]
    fn test_not_old() {
        let c = ContainerSnapshot {
            finished_at: Some(ts(2014, 1, 21, 0, 0)),
            ..container()
        };
        assert!(!should_remove_container(&c, now()));
    }

    #[test]
    fn test_finished_exactly_at_cutoff_is_kept() {
        let c = ContainerSnapshot {
            finished_at: Some(now()),
            ..container()
        };
        assert!(!should_remove_container(&c, now()));
    }

    #[test]
    fn test_has_been_running_since() {
        assert!(has_been_running_since(&container(), ts(2014, 1, 20, 0, 10)));
        assert!(!has_been_running_since(&container(), ts(2014, 1, 1, 0, 0)));

        let never_started = ContainerSnapshot {
            started_at: None,
            ..container()
        };
        assert!(!has_been_running_since(&never_started, now()));
    }

    #[test]
    fn test_has_been_running_since_exact_cutoff() {
        let started = ts(2014, 1, 1, 17, 1);
        assert!(!has_been_running_since(&container(), started));
        assert!(has_been_running_since(
            &container(),
            started + chrono::TimeDelta::seconds(1)
        ));
    }

    #[test]
    fn test_is_image_old() {
        let image = ImageSnapshot {
            id: "abcdabcdabcdabcd".into(),
            repo_tags: vec![],
            created: ts(2014, 1, 20, 5, 0),
        };
        assert!(is_image_old(&image, Some(now())));
        assert!(!is_image_old(&image, Some(ts(2014, 1, 20, 0, 10))));
        assert!(!is_image_old(&image, None));
    }

    #[test]
    fn test_tag_counter_without_quota() {
        let mut counter = TagCounter::new(None);
        assert!(!counter.exceeds(&image_summary("a", &["r1:latest", "r1:abcd"])));
        assert_eq!(counter.count("r1"), 0);
    }

    #[test]
    fn test_tag_counter_every_tag_must_exceed() {
        let images = [
            image_summary("A", &["r1:latest", "r1:abcd"]),
            image_summary("B", &["r2:latest", "r1:efgh"]),
            image_summary("C", &["r2:aaaa", "r1:bbbb"]),
        ];
        let mut counter = TagCounter::new(Some(1));

        let decisions: Vec<_> = images
            .iter()
            .rev()
            .map(|image| (image.id.as_str(), counter.exceeds(image)))
            .collect();

        assert_eq!(decisions, vec![("C", false), ("B", true), ("A", true)]);
        assert_eq!(counter.count("r1"), 4);
        assert_eq!(counter.count("r2"), 2);
    }

    #[test]
    fn test_tag_counter_one_tag_within_quota_keeps_image() {
        let mut counter = TagCounter::new(Some(1));
        assert!(!counter.exceeds(&image_summary("C", &["r1:one"])));
        // r1 now over quota, but r3 is new
        assert!(!counter.exceeds(&image_summary("B", &["r1:two", "r3:one"])));
        assert!(counter.exceeds(&image_summary("A", &["r1:three", "r3:two"])));
    }

    #[test]
    fn test_tag_counter_ignores_untagged() {
        let mut counter = TagCounter::new(Some(0));
        assert!(!counter.exceeds(&image_summary("a", &["<none>:<none>"])));
        assert!(counter.exceeds(&image_summary("b", &["r1:latest"])));
    }

    #[test]
    fn test_filter_images_in_use_by_reference() {
        let containers: Vec<ContainerSummary> =
            ["user/one:latest", "user/foo:latest", "other:12345", "2471708c19be:latest"]
                .iter()
                .map(|image| ContainerSummary {
                    image: image.to_string(),
                    ..Default::default()
                })
                .collect();
        let usage = ImageUsage::from_containers(&containers, ApiVersion::new(1, 17));

        let images = vec![
            image_summary("2471708c19beabababab", &["<none>:<none>"]),
            image_summary("babababababaabababab", &["<none>:<none>"]),
            image_summary("c", &["user/one:latest", "user/one:abcd"]),
            image_summary("d", &["other:abcda"]),
            image_summary("e", &["other:12345"]),
            image_summary("f", &["new_image:latest", "new_image:123"]),
        ];

        let ids: Vec<_> = filter_images_in_use(images, &usage)
            .into_iter()
            .map(|image| image.id)
            .collect();
        assert_eq!(ids, vec!["babababababaabababab", "d", "f"]);
    }

    #[test]
    fn test_filter_images_in_use_by_id() {
        let containers = vec![ContainerSummary {
            image: "app:latest".into(),
            image_id: Some("sha256:old".into()),
            ..Default::default()
        }];
        let usage = ImageUsage::from_containers(&containers, ApiVersion::new(1, 41));

        // the tag moved to a newer image; only the id keeps the old one alive
        let images = vec![
            image_summary("sha256:new", &["app:latest"]),
            image_summary("sha256:old", &["<none>:<none>"]),
        ];

        let ids: Vec<_> = filter_images_in_use(images, &usage)
            .into_iter()
            .map(|image| image.id)
            .collect();
        assert_eq!(ids, vec!["sha256:new"]);
    }

    #[test]
    fn test_filter_images_in_use_id_ignored_on_old_api() {
        let containers = vec![ContainerSummary {
            image: "app:latest".into(),
            image_id: Some("sha256:old".into()),
            ..Default::default()
        }];
        let usage = ImageUsage::from_containers(&containers, ApiVersion::new(1, 20));

        assert!(usage.in_use(&image_summary("sha256:new", &["app:latest"])));
        assert!(!usage.in_use(&image_summary("sha256:old", &["<none>:<none>"])));
    }

    #[test]
    fn test_filter_excluded_containers() {
        let labelled = |pairs: &[(&str, &str)]| ContainerSummary {
            labels: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..Default::default()
        };
        let matcher = LabelMatcher::parse(["keep", "env=prod*"]).unwrap();

        let kept = filter_excluded_containers(
            vec![
                labelled(&[]),
                labelled(&[("keep", "")]),
                labelled(&[("env", "production")]),
                labelled(&[("env", "dev")]),
            ],
            &matcher,
        );
        assert_eq!(kept, vec![labelled(&[]), labelled(&[("env", "dev")])]);
    }
}
