//! Garbage collection of stale containers, images and volumes.
//!
//! - [`matcher`]: prefix, label and tag-glob predicates
//! - [`eligibility`]: pure removal decisions over snapshots
//! - [`fault`]: per-item fault isolation for daemon calls
//! - [`collector`]: the ordered container, image and volume passes

pub mod collector;
pub mod eligibility;
pub mod fault;
pub mod matcher;

pub use collector::{GarbageCollector, ImageRemoval};
pub use matcher::{ContainerMatcher, ExclusionRule, ImageExclusion, LabelMatcher, PrefixMatcher};

use std::fmt;

/// Outcome of one pass over a single resource kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceReport {
    /// Items selected by the eligibility rules
    pub candidates: usize,
    /// Items whose daemon calls all succeeded
    pub removed: usize,
    /// Items with at least one failed daemon call
    pub failed: usize,
}

impl ResourceReport {
    pub fn new(candidates: usize) -> Self {
        Self {
            candidates,
            ..Default::default()
        }
    }

    pub fn record(&mut self, succeeded: bool) {
        if succeeded {
            self.removed += 1;
        } else {
            self.failed += 1;
        }
    }
}

impl fmt::Display for ResourceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} candidates, {} done, {} failed",
            self.candidates, self.removed, self.failed
        )
    }
}

/// Outcome of a garbage-collect run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub containers: ResourceReport,
    pub images: ResourceReport,
    pub volumes: ResourceReport,
}

impl fmt::Display for CleanupReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "containers: {}; images: {}; volumes: {}",
            self.containers, self.images, self.volumes
        )
    }
}
