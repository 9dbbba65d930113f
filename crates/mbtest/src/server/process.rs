//! Running `mb` as a child process.

use super::client::AdminClient;
use crate::config::{DEFAULT_PORT, DEFAULT_TIMEOUT};
use crate::error::{MountebankError, Result};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How to start a Mountebank executable
#[derive(Debug, Clone, PartialEq)]
pub struct StartOptions {
    pub executable: PathBuf,
    pub port: u16,
    /// How long to wait for the admin API to answer
    pub timeout: Duration,
    pub debug: bool,
    pub allow_injection: bool,
    pub local_only: bool,
    /// Directory Mountebank persists imposters to
    pub data_dir: Option<PathBuf>,
    pub extra_args: Vec<String>,
}

impl Default for StartOptions {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("mb"),
            port: DEFAULT_PORT,
            timeout: DEFAULT_TIMEOUT,
            debug: true,
            allow_injection: true,
            local_only: true,
            data_dir: None,
            extra_args: Vec::new(),
        }
    }
}

impl StartOptions {
    pub(crate) fn command(&self) -> Command {
        let mut command = Command::new(&self.executable);
        command.arg("start").arg("--port").arg(self.port.to_string());
        if self.debug {
            command.arg("--debug");
        }
        if self.allow_injection {
            command.arg("--allowInjection");
        }
        if self.local_only {
            command.arg("--localOnly");
        }
        if let Some(dir) = &self.data_dir {
            command.arg("--datadir").arg(dir);
        }
        command.args(&self.extra_args);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        command
    }
}

/// A Mountebank process owned by this crate; killed when dropped
#[derive(Debug)]
pub(crate) struct MountebankProcess {
    child: Child,
    port: u16,
}

impl MountebankProcess {
    /// Spawn `mb` and wait until its admin API answers.
    pub async fn spawn(options: &StartOptions, admin: &AdminClient) -> Result<Self> {
        let executable = options.executable.display().to_string();
        let child = options
            .command()
            .spawn()
            .map_err(|source| MountebankError::Spawn {
                executable: executable.clone(),
                source,
            })?;
        info!(executable = %executable, port = options.port, "Started Mountebank");

        let mut process = Self {
            child,
            port: options.port,
        };
        process.wait_until_ready(admin, options.timeout).await?;
        Ok(process)
    }

    async fn wait_until_ready(&mut self, admin: &AdminClient, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if admin.is_ready().await {
                debug!(port = self.port, "Mountebank is ready");
                return Ok(());
            }
            if let Some(status) = self.child.try_wait().map_err(|e| {
                MountebankError::Connection(format!("Cannot inspect Mountebank process: {e}"))
            })? {
                return Err(MountebankError::Connection(format!(
                    "Mountebank exited before becoming ready: {status}"
                )));
            }
            if Instant::now() >= deadline {
                self.stop().await;
                return Err(MountebankError::StartupTimeout {
                    port: self.port,
                    timeout,
                });
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    /// Kill the process and reap it.
    pub async fn stop(&mut self) {
        match self.child.kill().await {
            Ok(()) => info!(port = self.port, "Stopped Mountebank"),
            Err(e) => warn!(port = self.port, error = %e, "Failed to stop Mountebank"),
        }
    }
}
