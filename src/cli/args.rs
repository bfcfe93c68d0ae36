//! Command line arguments for `dcgc` and `dcstop`.
//!
//! Durations and label rules are validated while parsing, so malformed input
//! is reported as a usage error before the daemon is contacted.

use super::config::FileConfig;
use super::duration::{cutoff_from, parse_duration};
use super::exclude::build_exclude_set;
use crate::config::{ArgumentError, GcConfig, StopConfig};
use crate::env::DEFAULT_TIMEOUT_SECS;
use crate::gc::matcher::{
    ContainerMatcher, ExclusionRule, ImageExclusion, LabelMatcher, PrefixMatcher,
};
use chrono::{DateTime, TimeDelta, Utc};
use clap::{ArgGroup, Parser};
use std::path::PathBuf;

/// Remove old containers and images that are no longer in use.
#[derive(Debug, Parser)]
#[command(name = "dcgc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct GcArgs {
    /// Maximum age for a container. Containers older than this age will be removed.
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub max_container_age: Option<TimeDelta>,

    /// Maximum age for an image. Images older than this age will be removed.
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub max_image_age: Option<TimeDelta>,

    /// Maximum number of tags to keep for an image repository.
    #[arg(long, value_name = "COUNT")]
    pub max_tags_count: Option<usize>,

    /// Remove dangling volumes.
    #[arg(long)]
    pub dangling_volumes: bool,

    /// Only log actions, don't remove anything.
    #[arg(long)]
    pub dry_run: bool,

    /// HTTP timeout in seconds for making daemon API calls [default: 60]
    #[arg(short = 't', long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Never remove images with this tag (glob patterns allowed, repeatable).
    #[arg(long = "exclude-image", value_name = "TAG")]
    pub exclude_image: Vec<String>,

    /// File listing image tags to exclude, one per line.
    #[arg(long, value_name = "FILE")]
    pub exclude_image_file: Option<PathBuf>,

    /// Never remove containers with this label (glob patterns allowed, repeatable).
    #[arg(long = "exclude-container-label", value_name = "KEY[=VALUE]")]
    pub exclude_container_label: Vec<ExclusionRule>,

    /// Policy file in TOML format.
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Validated settings for a `dcgc` run.
#[derive(Debug, Clone)]
pub struct GcOptions {
    pub timeout: u64,
    pub gc: GcConfig,
}

fn file_duration(value: Option<&str>) -> Result<Option<TimeDelta>, ArgumentError> {
    Ok(value.map(parse_duration).transpose()?)
}

impl GcArgs {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Merge with the policy file, if any, and resolve cutoffs against `now`.
    pub fn into_options(self, now: DateTime<Utc>) -> Result<GcOptions, ArgumentError> {
        let file = match &self.config {
            Some(path) => FileConfig::from_toml_file(path)?,
            None => FileConfig::default(),
        };

        let max_container_age = match self.max_container_age {
            Some(age) => Some(age),
            None => file_duration(file.max_container_age.as_deref())?,
        };
        let max_image_age = match self.max_image_age {
            Some(age) => Some(age),
            None => file_duration(file.max_image_age.as_deref())?,
        };

        let mut image_tags = self.exclude_image;
        image_tags.extend(file.exclude_images);
        let exclude_file = self.exclude_image_file.or(file.exclude_image_file);
        let exclude_set = build_exclude_set(&image_tags, exclude_file.as_deref())?;

        let mut label_rules = self.exclude_container_label;
        for rule in &file.exclude_container_labels {
            label_rules.push(rule.parse()?);
        }

        Ok(GcOptions {
            timeout: self
                .timeout
                .or(file.timeout)
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
            gc: GcConfig {
                max_container_age: max_container_age
                    .map(|age| cutoff_from(age, now))
                    .transpose()?,
                max_image_age: max_image_age
                    .map(|age| cutoff_from(age, now))
                    .transpose()?,
                max_tags_count: self.max_tags_count.or(file.max_tags_count),
                dangling_volumes: self.dangling_volumes || file.dangling_volumes.unwrap_or(false),
                dry_run: self.dry_run,
                exclude_images: ImageExclusion::from_patterns(&exclude_set)?,
                exclude_container_labels: LabelMatcher::new(label_rules),
            },
        })
    }
}

/// Stop containers that have been running longer than a maximum run time.
#[derive(Debug, Parser)]
#[command(name = "dcstop")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
#[command(group(ArgGroup::new("selector").required(true).args(["prefix", "image"])))]
pub struct StopArgs {
    /// Maximum time a container is allowed to run.
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub max_run_time: TimeDelta,

    /// Only log actions, don't stop anything.
    #[arg(long)]
    pub dry_run: bool,

    /// HTTP timeout in seconds for making daemon API calls.
    #[arg(short = 't', long, value_name = "SECONDS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Only stop containers whose name starts with this prefix (repeatable).
    #[arg(long, value_name = "PREFIX")]
    pub prefix: Vec<String>,

    /// Only stop containers created from an image starting with this reference (repeatable).
    #[arg(long, value_name = "IMAGE")]
    pub image: Vec<String>,
}

impl StopArgs {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn into_config(self, now: DateTime<Utc>) -> Result<StopConfig, ArgumentError> {
        let matcher = if !self.prefix.is_empty() {
            ContainerMatcher::Name(PrefixMatcher::new(self.prefix))
        } else if !self.image.is_empty() {
            ContainerMatcher::Image(PrefixMatcher::new(self.image))
        } else {
            return Err(ArgumentError::Invalid(
                "one of --prefix or --image is required".to_string(),
            ));
        };

        Ok(StopConfig {
            max_run_time: cutoff_from(self.max_run_time, now)?,
            matcher,
            dry_run: self.dry_run,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::duration::DurationParseError;
    use chrono::TimeZone;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2014, 1, 20, 10, 10, 0).unwrap()
    }

    #[test]
    fn test_gc_args_with_defaults() {
        let args = GcArgs::try_parse_from(["dcgc"]).unwrap();
        assert!(!args.dry_run);
        assert!(args.max_container_age.is_none());
        assert!(args.max_image_age.is_none());

        let options = args.into_options(now()).unwrap();
        assert_eq!(options.timeout, 60);
        assert!(options.gc.max_container_age.is_none());
        assert!(!options.gc.cleans_images());
        assert!(!options.gc.dangling_volumes);
    }

    #[test]
    fn test_gc_args_with_args() {
        let args = GcArgs::try_parse_from([
            "dcgc",
            "--max-image-age",
            "30 days",
            "--max-container-age",
            "3d",
        ])
        .unwrap();
        assert_eq!(args.max_image_age, Some(TimeDelta::days(30)));
        assert_eq!(args.max_container_age, Some(TimeDelta::days(3)));

        let options = args.into_options(now()).unwrap();
        assert_eq!(
            options.gc.max_container_age,
            Some(Utc.with_ymd_and_hms(2014, 1, 17, 10, 10, 0).unwrap())
        );
        assert_eq!(
            options.gc.max_image_age,
            Some(Utc.with_ymd_and_hms(2013, 12, 21, 10, 10, 0).unwrap())
        );
    }

    #[test]
    fn test_gc_args_bad_duration_is_usage_error() {
        let err = GcArgs::try_parse_from(["dcgc", "--max-image-age", "eventually"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_gc_args_bad_label_rule_is_usage_error() {
        let err =
            GcArgs::try_parse_from(["dcgc", "--exclude-container-label", "=x"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_gc_args_repeatable_excludes() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# keep\nfile/image:1").unwrap();

        let args = GcArgs::try_parse_from([
            "dcgc",
            "--max-tags-count",
            "2",
            "--exclude-image",
            "a:*",
            "--exclude-image",
            "b:1",
            "--exclude-image-file",
            file.path().to_str().unwrap(),
            "--exclude-container-label",
            "keep",
            "--exclude-container-label",
            "env=prod",
        ])
        .unwrap();

        let options = args.into_options(now()).unwrap();
        assert_eq!(options.gc.max_tags_count, Some(2));
        assert_eq!(options.gc.exclude_images.len(), 3);
        assert!(!options.gc.exclude_container_labels.is_empty());
    }

    #[test]
    fn test_gc_args_merge_policy_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "timeout = 5\nmax_image_age = \"1d\"\nmax_tags_count = 3\ndangling_volumes = true\nexclude_images = [\"base:*\"]"
        )
        .unwrap();

        let args = GcArgs::try_parse_from([
            "dcgc",
            "--config",
            file.path().to_str().unwrap(),
            "--max-tags-count",
            "7",
            "--exclude-image",
            "app:*",
        ])
        .unwrap();

        let options = args.into_options(now()).unwrap();
        assert_eq!(options.timeout, 5);
        assert_eq!(options.gc.max_tags_count, Some(7));
        assert_eq!(
            options.gc.max_image_age,
            Some(Utc.with_ymd_and_hms(2014, 1, 19, 10, 10, 0).unwrap())
        );
        assert!(options.gc.dangling_volumes);
        assert_eq!(options.gc.exclude_images.len(), 2);
    }

    #[test]
    fn test_gc_args_bad_duration_in_policy_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "max_container_age = \"whenever\"").unwrap();

        let args =
            GcArgs::try_parse_from(["dcgc", "--config", file.path().to_str().unwrap()]).unwrap();
        assert!(matches!(
            args.into_options(now()),
            Err(ArgumentError::Duration(_))
        ));
    }

    #[test]
    fn test_gc_args_age_beyond_calendar_range() {
        let args =
            GcArgs::try_parse_from(["dcgc", "--max-image-age", "300000000 weeks"]).unwrap();
        assert!(matches!(
            args.into_options(now()),
            Err(ArgumentError::Duration(DurationParseError::OutOfRange(_)))
        ));

        let args = GcArgs::try_parse_from(["dcgc", "--max-container-age", "1e15"]).unwrap();
        assert!(matches!(
            args.into_options(now()),
            Err(ArgumentError::Duration(DurationParseError::OutOfRange(_)))
        ));
    }

    #[test]
    fn test_gc_args_age_beyond_calendar_range_in_policy_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "max_image_age = \"300000000 weeks\"").unwrap();

        let args =
            GcArgs::try_parse_from(["dcgc", "--config", file.path().to_str().unwrap()]).unwrap();
        assert!(matches!(
            args.into_options(now()),
            Err(ArgumentError::Duration(DurationParseError::OutOfRange(_)))
        ));
    }

    #[test]
    fn test_stop_args_run_time_beyond_calendar_range() {
        let args = StopArgs::try_parse_from([
            "dcstop",
            "--max-run-time",
            "1e15",
            "--prefix",
            "app_",
        ])
        .unwrap();
        assert!(matches!(
            args.into_config(now()),
            Err(ArgumentError::Duration(DurationParseError::OutOfRange(_)))
        ));
    }

    #[test]
    fn test_stop_args_with_defaults() {
        let args = StopArgs::try_parse_from([
            "dcstop",
            "--max-run-time",
            "24h",
            "--prefix",
            "one",
            "--prefix",
            "two",
        ])
        .unwrap();
        assert_eq!(args.timeout, 60);
        assert!(!args.dry_run);
        assert_eq!(args.prefix, vec!["one", "two"]);
        assert_eq!(args.max_run_time, TimeDelta::hours(24));

        let config = args.into_config(now()).unwrap();
        assert_eq!(
            config.matcher,
            ContainerMatcher::Name(PrefixMatcher::new(["one", "two"]))
        );
        assert_eq!(
            config.max_run_time,
            Utc.with_ymd_and_hms(2014, 1, 19, 10, 10, 0).unwrap()
        );
    }

    #[test]
    fn test_stop_args_image_matcher() {
        let args = StopArgs::try_parse_from([
            "dcstop",
            "--max-run-time",
            "1h",
            "--image",
            "docker.io/test/",
        ])
        .unwrap();
        let config = args.into_config(now()).unwrap();
        assert!(matches!(config.matcher, ContainerMatcher::Image(_)));
    }

    #[test]
    fn test_stop_args_require_selector() {
        let err = StopArgs::try_parse_from(["dcstop", "--max-run-time", "1h"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_stop_args_prefix_and_image_conflict() {
        let err = StopArgs::try_parse_from([
            "dcstop",
            "--max-run-time",
            "1h",
            "--prefix",
            "a",
            "--image",
            "b",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_stop_args_require_max_run_time() {
        let err = StopArgs::try_parse_from(["dcstop", "--prefix", "a"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }
}
