//! Runtime configuration passed explicitly to each component.
//!
//! [`ClientConfig`] describes how to reach the daemon and is built from the
//! standard environment variables. [`GcConfig`] and [`StopConfig`] carry the
//! already-validated policy for one run: cutoffs are absolute instants and all
//! patterns are compiled, so nothing left here can fail after the first remote
//! call.

use crate::cli::duration::DurationParseError;
use crate::container::version::{ApiVersion, ParseApiVersionError};
use crate::env::{self, DEFAULT_TIMEOUT_SECS};
use crate::gc::matcher::{ContainerMatcher, ImageExclusion, LabelMatcher};
use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// Invalid command line or configuration input, reported before any remote call.
#[derive(Debug, thiserror::Error)]
pub enum ArgumentError {
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("invalid label rule '{0}', expected key[=value]")]
    InvalidLabelRule(String),

    #[error("failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration file {path}: {reason}")]
    ConfigFile { path: PathBuf, reason: String },

    #[error(transparent)]
    Duration(#[from] DurationParseError),

    #[error(transparent)]
    ApiVersion(#[from] ParseApiVersionError),

    #[error("{0}")]
    Invalid(String),
}

/// API version selection for the daemon connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApiVersionSetting {
    /// Negotiate against the version the daemon reports
    #[default]
    Auto,
    /// Use exactly this version
    Fixed(ApiVersion),
}

impl std::str::FromStr for ApiVersionSetting {
    type Err = ParseApiVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() || s.trim().eq_ignore_ascii_case(env::daemon::AUTO_API_VERSION) {
            return Ok(ApiVersionSetting::Auto);
        }
        s.parse().map(ApiVersionSetting::Fixed)
    }
}

/// Client certificate material for a TLS daemon endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsMaterial {
    pub key: PathBuf,
    pub cert: PathBuf,
    pub ca: PathBuf,
}

impl TlsMaterial {
    /// Standard file names inside a certificate directory.
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            key: dir.join(env::daemon::TLS_KEY_FILE),
            cert: dir.join(env::daemon::TLS_CERT_FILE),
            ca: dir.join(env::daemon::TLS_CA_FILE),
        }
    }
}

/// Daemon connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Endpoint URL (`unix://`, `tcp://` or `http://`)
    pub host: String,
    pub tls: Option<TlsMaterial>,
    pub api_version: ApiVersionSetting,
    /// HTTP timeout in seconds for each daemon call
    pub timeout: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: env::daemon::DEFAULT_HOST.to_string(),
            tls: None,
            api_version: ApiVersionSetting::Auto,
            timeout: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ClientConfig {
    /// Build from the process environment.
    pub fn from_env(timeout: u64) -> Result<Self, ArgumentError> {
        Self::from_lookup(timeout, |name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<F>(timeout: u64, lookup: F) -> Result<Self, ArgumentError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup(env::daemon::HOST_VAR)
            .filter(|h| !h.trim().is_empty())
            .unwrap_or_else(|| env::daemon::DEFAULT_HOST.to_string());

        let tls_enabled = lookup(env::daemon::TLS_VERIFY_VAR)
            .map(|v| !v.is_empty() && v != "0")
            .unwrap_or(false);

        let tls = if tls_enabled {
            let dir = lookup(env::daemon::CERT_PATH_VAR).ok_or_else(|| {
                ArgumentError::Invalid(format!(
                    "{} is set but {} is not",
                    env::daemon::TLS_VERIFY_VAR,
                    env::daemon::CERT_PATH_VAR
                ))
            })?;
            Some(TlsMaterial::from_dir(dir))
        } else {
            None
        };

        let api_version = match lookup(env::daemon::API_VERSION_VAR) {
            Some(value) => value.parse()?,
            None => ApiVersionSetting::Auto,
        };

        Ok(Self {
            host,
            tls,
            api_version,
            timeout,
        })
    }
}

/// Policy for one garbage-collect run.
#[derive(Debug, Clone, Default)]
pub struct GcConfig {
    /// Remove stopped containers that finished before this instant
    pub max_container_age: Option<DateTime<Utc>>,
    /// Remove unused images created before this instant
    pub max_image_age: Option<DateTime<Utc>>,
    /// Keep at most this many tags per repository
    pub max_tags_count: Option<usize>,
    pub dangling_volumes: bool,
    pub dry_run: bool,
    pub exclude_images: ImageExclusion,
    pub exclude_container_labels: LabelMatcher,
}

impl GcConfig {
    /// Whether the image pass has anything to decide on.
    pub fn cleans_images(&self) -> bool {
        self.max_image_age.is_some() || self.max_tags_count.is_some()
    }
}

/// Policy for one stop-stale-containers run.
#[derive(Debug, Clone)]
pub struct StopConfig {
    /// Stop containers that started before this instant
    pub max_run_time: DateTime<Utc>,
    pub matcher: ContainerMatcher,
    pub dry_run: bool,
}
