//! Mountebank server lifecycle.
//!
//! This module provides:
//! - `MountebankServer`: a handle on a running server, either spawned here or already running
//! - `AdminClient`: the admin API calls the handle is built on
//! - `StartOptions`: how to spawn `mb`
//!
//! Imposters are registered for the duration of a scope with
//! [`MountebankServer::with_imposters`], which removes them again however the
//! scope ends.

mod client;
mod process;

pub use client::{AdminClient, ServerConfig};
pub use process::StartOptions;

use crate::config::{authority, MbtestConfig};
use crate::error::Result;
use crate::imposters::{Imposter, ImposterDetail, RecordedRequest};
use crate::version::Version;
use futures::FutureExt;
use process::MountebankProcess;
use std::future::Future;
use std::panic::{resume_unwind, AssertUnwindSafe};
use tracing::{debug, warn};

/// Handle on a Mountebank server.
///
/// ```no_run
/// use mbtest::imposters::{Imposter, Response, Stub};
/// use mbtest::server::MountebankServer;
///
/// # async fn run() -> mbtest::Result<()> {
/// let server = MountebankServer::existing("localhost", 2525)?;
/// let imposter = Imposter::new(Stub::responding(Response::new().body("sausages")));
///
/// let body = server
///     .with_imposters([imposter], |imposters| async move {
///         let url = imposters[0].url()?;
///         Ok::<_, mbtest::MountebankError>(reqwest::get(url).await?.text().await?)
///     })
///     .await??;
/// assert_eq!(body, "sausages");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MountebankServer {
    admin: AdminClient,
    host: String,
    port: u16,
    process: Option<MountebankProcess>,
}

impl MountebankServer {
    /// Attach to a server that is already running.
    pub fn existing(host: impl Into<String>, port: u16) -> Result<Self> {
        let host = host.into();
        let admin = AdminClient::new(&format!("http://{}", authority(&host, port)))?;
        Ok(Self {
            admin,
            host,
            port,
            process: None,
        })
    }

    /// Spawn `mb` on localhost and wait for it to accept requests.
    pub async fn start(options: StartOptions) -> Result<Self> {
        let mut server = Self::existing("localhost", options.port)?;
        server.process = Some(MountebankProcess::spawn(&options, &server.admin).await?);
        Ok(server)
    }

    /// Spawn `MBTEST_EXECUTABLE` when configured, otherwise attach to `MBTEST_HOST:MBTEST_PORT`.
    pub async fn from_config(config: &MbtestConfig) -> Result<Self> {
        match &config.executable {
            Some(executable) => {
                Self::start(StartOptions {
                    executable: executable.clone(),
                    port: config.port,
                    timeout: config.timeout,
                    ..StartOptions::default()
                })
                .await
            }
            None => Self::existing(config.host.clone(), config.port),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn admin(&self) -> &AdminClient {
        &self.admin
    }

    /// Whether this handle owns the server process
    pub fn is_managed(&self) -> bool {
        self.process.is_some()
    }

    pub async fn is_ready(&self) -> bool {
        self.admin.is_ready().await
    }

    /// Version the server reports
    pub async fn version(&self) -> Result<Version> {
        Ok(self.admin.config().await?.version)
    }

    /// Register an imposter and attach it to this server.
    pub async fn add_imposter(&self, imposter: &mut Imposter) -> Result<()> {
        let created = self.admin.create_imposter(imposter).await?;
        let port = created.imposter.port.or(imposter.port).ok_or_else(|| {
            crate::MountebankError::Parse("Mountebank did not report an imposter port".into())
        })?;
        imposter.attach(self.host.clone(), port);
        debug!(port, "Imposter attached");
        Ok(())
    }

    /// Register imposters in order, stopping at the first failure.
    pub async fn add_imposters(&self, imposters: &mut [Imposter]) -> Result<()> {
        for imposter in imposters.iter_mut() {
            self.add_imposter(imposter).await?;
        }
        Ok(())
    }

    /// Remove an imposter from the server and detach it. Unattached imposters are left alone.
    pub async fn delete_imposter(&self, imposter: &mut Imposter) -> Result<()> {
        if !imposter.is_attached() {
            return Ok(());
        }
        if let Some(port) = imposter.port {
            self.admin.delete_imposter(port).await?;
        }
        imposter.detach();
        Ok(())
    }

    /// Remove every attached imposter, attempting all of them and reporting the first failure.
    pub async fn delete_imposters(&self, imposters: &mut [Imposter]) -> Result<()> {
        let mut first_error = None;
        for imposter in imposters.iter_mut() {
            if let Err(e) = self.delete_imposter(imposter).await {
                warn!(port = ?imposter.port, error = %e, "Failed to delete imposter");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    pub async fn delete_all_imposters(&self) -> Result<()> {
        self.admin.delete_all_imposters().await
    }

    /// Every imposter on the server, attached to this server's host
    pub async fn query_all_imposters(&self) -> Result<Vec<Imposter>> {
        let mut imposters = self.admin.list_imposters().await?;
        for imposter in &mut imposters {
            if let Some(port) = imposter.port {
                imposter.attach(self.host.clone(), port);
            }
        }
        Ok(imposters)
    }

    pub async fn get_imposter(&self, port: u16) -> Result<ImposterDetail> {
        self.admin.get_imposter(port).await
    }

    /// Requests an imposter has recorded. The imposter needs `record_requests` set.
    pub async fn get_actual_requests(&self, imposter: &Imposter) -> Result<Vec<RecordedRequest>> {
        let port = imposter.port.ok_or(crate::MountebankError::NotAttached)?;
        Ok(self.admin.get_imposter(port).await?.requests)
    }

    /// Forget the requests an imposter has recorded so far.
    pub async fn clear_requests(&self, imposter: &Imposter) -> Result<()> {
        let port = imposter.port.ok_or(crate::MountebankError::NotAttached)?;
        self.admin.clear_requests(port).await
    }

    /// Register `imposters`, run `body` with the attached copies, then remove them.
    ///
    /// Removal happens however `body` ends. A panic inside `body` (a failed
    /// assertion, typically) is re-raised once the imposters are gone. If
    /// registration fails, imposters registered so far are removed and the error
    /// returned without running `body`.
    pub async fn with_imposters<F, Fut, T>(
        &self,
        imposters: impl IntoIterator<Item = Imposter>,
        body: F,
    ) -> Result<T>
    where
        F: FnOnce(Vec<Imposter>) -> Fut,
        Fut: Future<Output = T>,
    {
        let mut imposters: Vec<Imposter> = imposters.into_iter().collect();
        if let Err(e) = self.add_imposters(&mut imposters).await {
            if let Err(cleanup) = self.delete_imposters(&mut imposters).await {
                warn!(error = %cleanup, "Cleanup after failed registration also failed");
            }
            return Err(e);
        }

        let outcome = AssertUnwindSafe(body(imposters.clone()))
            .catch_unwind()
            .await;
        let cleanup = self.delete_imposters(&mut imposters).await;

        match outcome {
            Err(panic) => {
                if let Err(e) = cleanup {
                    warn!(error = %e, "Failed to remove imposters after panic");
                }
                resume_unwind(panic)
            }
            Ok(value) => cleanup.map(|()| value),
        }
    }

    /// Stop the server process, if this handle started one.
    pub async fn close(mut self) {
        if let Some(mut process) = self.process.take() {
            process.stop().await;
        }
    }
}
