//! Environment-driven configuration for test fixtures.
//!
//! | Variable              | Default     | Meaning                                        |
//! |-----------------------|-------------|------------------------------------------------|
//! | `MBTEST_VERSION`      | `2.0`       | Version of the Mountebank server under test    |
//! | `MBTEST_HOST`         | `localhost` | Host of an already running server              |
//! | `MBTEST_PORT`         | `2525`      | Admin port (existing or spawned server)        |
//! | `MBTEST_EXECUTABLE`   | unset       | `mb` executable to spawn instead of attaching  |
//! | `MBTEST_TIMEOUT_SECS` | `5`         | How long to wait for a spawned server to start |

use crate::error::{MountebankError, Result};
use crate::version::Version;
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_VERSION: &str = "MBTEST_VERSION";
pub const ENV_HOST: &str = "MBTEST_HOST";
pub const ENV_PORT: &str = "MBTEST_PORT";
pub const ENV_EXECUTABLE: &str = "MBTEST_EXECUTABLE";
pub const ENV_TIMEOUT: &str = "MBTEST_TIMEOUT_SECS";

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 2525;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Where the Mountebank server under test lives and what it can do
#[derive(Debug, Clone, PartialEq)]
pub struct MbtestConfig {
    /// Declared server version, used to skip tests the server cannot run
    pub version: Version,
    pub host: String,
    pub port: u16,
    /// When set, fixtures spawn this executable rather than attaching to `host:port`
    pub executable: Option<PathBuf>,
    pub timeout: Duration,
}

impl Default for MbtestConfig {
    fn default() -> Self {
        Self {
            version: Version::new(2, 0, 0),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            executable: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl MbtestConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary lookup, so tests need not touch the environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(version) = lookup(ENV_VERSION) {
            config.version = version.parse()?;
        }
        if let Some(host) = lookup(ENV_HOST) {
            config.host = host.trim().to_string();
        }
        if let Some(port) = lookup(ENV_PORT) {
            config.port = port
                .trim()
                .parse()
                .map_err(|_| MountebankError::Config(format!("{ENV_PORT}={port} is not a port")))?;
        }
        if let Some(executable) = lookup(ENV_EXECUTABLE) {
            config.executable = Some(PathBuf::from(executable.trim()));
        }
        if let Some(timeout) = lookup(ENV_TIMEOUT) {
            let secs: u64 = timeout.trim().parse().map_err(|_| {
                MountebankError::Config(format!("{ENV_TIMEOUT}={timeout} is not a number of seconds"))
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Admin API root, e.g. `http://localhost:2525`
    pub fn admin_url(&self) -> String {
        format!("http://{}", authority(&self.host, self.port))
    }

    /// Whether the declared server version can run injection responses.
    pub fn supports_injection(&self) -> bool {
        self.version.supports_injection()
    }
}

/// `host:port`, with IPv6 literals bracketed.
pub(crate) fn authority(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let config = MbtestConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, MbtestConfig::default());
        assert_eq!(config.admin_url(), "http://localhost:2525");
        assert!(config.supports_injection());
    }

    #[test]
    fn test_all_variables() {
        let config = MbtestConfig::from_lookup(lookup_from(&[
            ("MBTEST_VERSION", "2.9.1"),
            ("MBTEST_HOST", "mb.internal"),
            ("MBTEST_PORT", "3525"),
            ("MBTEST_EXECUTABLE", "/usr/local/bin/mb"),
            ("MBTEST_TIMEOUT_SECS", "12"),
        ]))
        .unwrap();

        assert_eq!(config.version, Version::new(2, 9, 1));
        assert_eq!(config.admin_url(), "http://mb.internal:3525");

        let ipv6 = MbtestConfig {
            host: "::1".into(),
            ..MbtestConfig::default()
        };
        assert_eq!(ipv6.admin_url(), "http://[::1]:2525");
        assert_eq!(config.executable, Some(PathBuf::from("/usr/local/bin/mb")));
        assert_eq!(config.timeout, Duration::from_secs(12));
    }

    #[test]
    fn test_old_version_disables_injection() {
        let config = MbtestConfig::from_lookup(lookup_from(&[("MBTEST_VERSION", "1.14")])).unwrap();
        assert!(!config.supports_injection());
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config =
            MbtestConfig::from_lookup(lookup_from(&[("MBTEST_HOST", "  "), ("MBTEST_EXECUTABLE", "")]))
                .unwrap();
        assert_eq!(config.host, "localhost");
        assert!(config.executable.is_none());
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert!(matches!(
            MbtestConfig::from_lookup(lookup_from(&[("MBTEST_PORT", "99999")])),
            Err(MountebankError::Config(_))
        ));
        assert!(matches!(
            MbtestConfig::from_lookup(lookup_from(&[("MBTEST_VERSION", "latest")])),
            Err(MountebankError::InvalidVersion(_))
        ));
        assert!(matches!(
            MbtestConfig::from_lookup(lookup_from(&[("MBTEST_TIMEOUT_SECS", "soon")])),
            Err(MountebankError::Config(_))
        ));
    }

    #[test]
    #[serial_test::serial]
    fn test_from_env_reads_process_environment() {
        std::env::set_var(ENV_VERSION, "1.13");
        std::env::set_var(ENV_PORT, "4525");
        let config = MbtestConfig::from_env();
        std::env::remove_var(ENV_VERSION);
        std::env::remove_var(ENV_PORT);

        let config = config.unwrap();
        assert_eq!(config.port, 4525);
        assert!(!config.supports_injection());
    }
}
