//! Environment constants for the custodian tools.
//!
//! This module centralizes the daemon environment variable names, sentinel
//! values reported by the daemon, and defaults shared by both binaries.

/// Daemon connection environment variables
pub mod daemon {
    /// Daemon endpoint, e.g. `unix:///var/run/docker.sock` or `tcp://host:2376`
    pub const HOST_VAR: &str = "DOCKER_HOST";

    /// Enables TLS when set to a non-empty value other than `0`
    pub const TLS_VERIFY_VAR: &str = "DOCKER_TLS_VERIFY";

    /// Directory holding `key.pem`, `cert.pem` and `ca.pem`
    pub const CERT_PATH_VAR: &str = "DOCKER_CERT_PATH";

    /// Pinned API version (`major.minor`) or `auto`
    pub const API_VERSION_VAR: &str = "DOCKER_API_VERSION";

    /// Endpoint used when `DOCKER_HOST` is unset
    pub const DEFAULT_HOST: &str = "unix:///var/run/docker.sock";

    /// Value of `DOCKER_API_VERSION` requesting negotiation with the daemon
    pub const AUTO_API_VERSION: &str = "auto";

    pub const TLS_KEY_FILE: &str = "key.pem";
    pub const TLS_CERT_FILE: &str = "cert.pem";
    pub const TLS_CA_FILE: &str = "ca.pem";
}

/// Default HTTP timeout in seconds for a single daemon call
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Timestamp the daemon reports for events that never happened
pub const YEAR_ZERO: &str = "0001-01-01T00:00:00Z";

/// Tag the daemon reports for an image without repository tags
pub const UNTAGGED: &str = "<none>:<none>";

/// Lowest API version whose container listing carries the image id
pub const IMAGE_ID_MIN_API_VERSION: (usize, usize) = (1, 21);

/// Number of id characters shown in log lines
pub const LOG_ID_LEN: usize = 16;

/// Number of id characters the daemon uses for an untagged image reference
pub const SHORT_ID_LEN: usize = 12;

/// Default tracing filter for the binaries
pub const DEFAULT_LOG_FILTER: &str = "custodian=info,dcgc=info,dcstop=info";

/// Shorten an id for display, tolerating ids shorter than `len`.
pub fn truncate_id(id: &str, len: usize) -> &str {
    id.get(..len).unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_id() {
        assert_eq!(truncate_id("abcdabcdabcdabcdabcd", LOG_ID_LEN), "abcdabcdabcdabcd");
        assert_eq!(truncate_id("abcd", LOG_ID_LEN), "abcd");
    }
}
