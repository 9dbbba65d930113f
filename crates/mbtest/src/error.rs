//! Error type shared by the admin client, the server lifecycle, and configuration.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when driving a Mountebank server
#[derive(Error, Debug)]
pub enum MountebankError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Mountebank returned error: {message} (code: {code})")]
    Server { code: String, message: String },
    #[error("Failed to parse response: {0}")]
    Parse(String),
    #[error("Connection failed: {0}")]
    Connection(String),
    #[error("Failed to start Mountebank executable {executable}: {source}")]
    Spawn {
        executable: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Mountebank did not become ready on port {port} within {timeout:?}")]
    StartupTimeout { port: u16, timeout: Duration },
    #[error("Imposter is not attached to a server and has no port")]
    NotAttached,
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("Invalid version string: {0}")]
    InvalidVersion(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<serde_json::Error> for MountebankError {
    fn from(err: serde_json::Error) -> Self {
        MountebankError::Parse(err.to_string())
    }
}

/// Result alias used throughout the crate
pub type Result<T, E = MountebankError> = std::result::Result<T, E>;
