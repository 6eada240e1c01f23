//! Process-wide executor configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

const DEFAULT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_STAGING_DIR: &str = "/tmp/crucible-staging";
const DEFAULT_MEMORY_LIMIT_BYTES: i64 = 256 * 1024 * 1024;
const DEFAULT_CPU_SHARES: i64 = 512;

/// Resource ceilings and paths applied to every execution.
///
/// Ceilings are process-wide configuration; they are never negotiated
/// per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[non_exhaustive]
pub struct ExecutorConfig {
    /// Hard deadline for one submission, in seconds.
    pub timeout_secs: u64,

    /// Shared staging directory for submission files. Must be
    /// path-equivalent for this process and the container runtime, since
    /// staged files are bind-mounted by host path.
    pub staging_dir: PathBuf,

    /// Memory ceiling per sandbox, in bytes.
    pub memory_limit_bytes: i64,

    /// Relative CPU weight per sandbox.
    pub cpu_shares: i64,
}

impl ExecutorConfig {
    /// Configuration with the built-in defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The execution deadline as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            staging_dir: PathBuf::from(DEFAULT_STAGING_DIR),
            memory_limit_bytes: DEFAULT_MEMORY_LIMIT_BYTES,
            cpu_shares: DEFAULT_CPU_SHARES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ExecutorConfig::new();
        assert_eq!(config.timeout_secs, 15);
        assert_eq!(config.timeout(), Duration::from_secs(15));
        assert_eq!(config.staging_dir, PathBuf::from("/tmp/crucible-staging"));
        assert_eq!(config.memory_limit_bytes, 256 * 1024 * 1024);
        assert_eq!(config.cpu_shares, 512);
    }

    #[test]
    fn partial_deserialization_fills_defaults() {
        let config: ExecutorConfig = match serde_json::from_str(r#"{"timeout_secs": 2}"#) {
            Ok(c) => c,
            Err(e) => panic!("deserialization failed: {e}"),
        };
        assert_eq!(config.timeout_secs, 2);
        assert_eq!(config.cpu_shares, 512, "unspecified fields must take defaults");
    }
}
