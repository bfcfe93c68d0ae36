//! Policy file loading for `dcgc`.
//!
//! A TOML file may carry the same policy as the command line flags:
//!
//! ```toml
//! timeout = 120
//! max_container_age = "3d"
//! max_image_age = "30 days"
//! max_tags_count = 5
//! dangling_volumes = true
//! exclude_images = ["registry.local/base:*"]
//! exclude_image_file = "/etc/custodian/keep-images"
//! exclude_container_labels = ["com.example.keep", "env=prod*"]
//! ```
//!
//! Flags take precedence over scalar values; lists are merged.

use crate::config::ArgumentError;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub timeout: Option<u64>,
    pub max_container_age: Option<String>,
    pub max_image_age: Option<String>,
    pub max_tags_count: Option<usize>,
    pub dangling_volumes: Option<bool>,
    pub exclude_images: Vec<String>,
    pub exclude_image_file: Option<PathBuf>,
    pub exclude_container_labels: Vec<String>,
}

impl FileConfig {
    /// Load from TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ArgumentError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ArgumentError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|e| ArgumentError::ConfigFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Load from TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_config() {
        assert_eq!(FileConfig::from_toml_str("").unwrap(), FileConfig::default());
    }

    #[test]
    fn test_full_config() {
        let config = FileConfig::from_toml_str(
            r#"
            timeout = 120
            max_container_age = "3d"
            max_tags_count = 5
            dangling_volumes = true
            exclude_images = ["base:*"]
            exclude_container_labels = ["keep"]
            "#,
        )
        .unwrap();

        assert_eq!(config.timeout, Some(120));
        assert_eq!(config.max_container_age.as_deref(), Some("3d"));
        assert_eq!(config.max_image_age, None);
        assert_eq!(config.max_tags_count, Some(5));
        assert_eq!(config.dangling_volumes, Some(true));
        assert_eq!(config.exclude_images, vec!["base:*"]);
        assert_eq!(config.exclude_container_labels, vec!["keep"]);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(FileConfig::from_toml_str("max_age = \"3d\"").is_err());
    }

    #[test]
    fn test_config_file_operations() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("custodian.toml");
        fs::write(
            &config_path,
            "max_image_age = \"30 days\"\nexclude_images = [\"keep:*\"]\n",
        )
        .unwrap();

        let loaded = FileConfig::from_toml_file(&config_path).unwrap();
        assert_eq!(
            loaded,
            FileConfig {
                max_image_age: Some("30 days".into()),
                exclude_images: vec!["keep:*".into()],
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = FileConfig::from_toml_file(temp_dir.path().join("missing.toml"));
        assert!(matches!(result, Err(ArgumentError::ReadFile { .. })));
    }
}
