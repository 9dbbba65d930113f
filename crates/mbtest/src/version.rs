//! Mountebank version numbers.
//!
//! Versions are compared component-wise, so `2.10` sorts after `2.9`.
//! Missing components count as zero: `2` == `2.0` == `2.0.0`.

use crate::error::MountebankError;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;

/// Oldest Mountebank release that supports `inject` responses
pub const INJECTION_MIN_VERSION: Version = Version::new(2, 0, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Whether a server at this version can evaluate injection responses.
    pub fn supports_injection(&self) -> bool {
        *self >= INJECTION_MIN_VERSION
    }
}

impl FromStr for Version {
    type Err = MountebankError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('v');
        // Pre-release and build suffixes ("2.9.1-beta.1234") do not affect ordering here
        let core = trimmed
            .split(|c| c == '-' || c == '+')
            .next()
            .unwrap_or_default();
        if core.is_empty() {
            return Err(MountebankError::InvalidVersion(s.to_string()));
        }

        let mut parts = [0u32; 3];
        for (i, part) in core.split('.').enumerate() {
            if i >= parts.len() {
                return Err(MountebankError::InvalidVersion(s.to_string()));
            }
            parts[i] = part
                .parse()
                .map_err(|_| MountebankError::InvalidVersion(s.to_string()))?;
        }

        Ok(Version::new(parts[0], parts[1], parts[2]))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}
