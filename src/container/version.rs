//! Daemon API version handling.

use crate::env::IMAGE_ID_MIN_API_VERSION;
use std::fmt;
use std::str::FromStr;

/// A `major.minor` daemon API version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ApiVersion {
    pub major: usize,
    pub minor: usize,
}

impl ApiVersion {
    pub const fn new(major: usize, minor: usize) -> Self {
        Self { major, minor }
    }

    /// Whether container listings at this version report the image id.
    pub fn reports_image_id(&self) -> bool {
        let (major, minor) = IMAGE_ID_MIN_API_VERSION;
        *self >= ApiVersion::new(major, minor)
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Error returned when a version string is not `major.minor`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid API version '{0}', expected major.minor")]
pub struct ParseApiVersionError(pub String);

impl FromStr for ApiVersion {
    type Err = ParseApiVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('v');
        let (major, minor) = trimmed
            .split_once('.')
            .ok_or_else(|| ParseApiVersionError(s.to_string()))?;

        let major = major
            .parse()
            .map_err(|_| ParseApiVersionError(s.to_string()))?;
        let minor = minor
            .parse()
            .map_err(|_| ParseApiVersionError(s.to_string()))?;

        Ok(ApiVersion { major, minor })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version() {
        assert_eq!("1.41".parse::<ApiVersion>().unwrap(), ApiVersion::new(1, 41));
        assert_eq!("v1.9".parse::<ApiVersion>().unwrap(), ApiVersion::new(1, 9));
        assert!("auto".parse::<ApiVersion>().is_err());
        assert!("1".parse::<ApiVersion>().is_err());
    }

    #[test]
    fn test_ordering_is_numeric() {
        assert!(ApiVersion::new(1, 9) < ApiVersion::new(1, 21));
        assert!(ApiVersion::new(2, 0) > ApiVersion::new(1, 48));
    }

    #[test]
    fn test_reports_image_id_threshold() {
        assert!(!ApiVersion::new(1, 17).reports_image_id());
        assert!(ApiVersion::new(1, 21).reports_image_id());
        assert!(ApiVersion::new(1, 43).reports_image_id());
    }
}
