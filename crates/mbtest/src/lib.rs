//! Mountebank test client.
//!
//! Build imposters in memory, register them with a Mountebank server for the
//! length of a test, call them over real HTTP, and assert on what comes back.
//!
//! # Example
//!
//! ```no_run
//! use mbtest::imposters::{Imposter, Response, Stub};
//! use mbtest::matchers::{assert_that, is_response, CapturedResponse};
//! use mbtest::server::MountebankServer;
//!
//! # async fn run() -> mbtest::Result<()> {
//! let server = MountebankServer::existing("localhost", 2525)?;
//! let imposter = Imposter::new(Stub::responding(Response::new().status_code(204)));
//!
//! server
//!     .with_imposters([imposter], |imposters| async move {
//!         let response = reqwest::get(imposters[0].url()?).await?;
//!         let response = CapturedResponse::capture(response).await?;
//!         assert_that(&response, &is_response().with_status_code(204));
//!         Ok::<_, mbtest::MountebankError>(())
//!     })
//!     .await??;
//! # Ok(())
//! # }
//! ```
//!
//! Fixtures read their settings from `MBTEST_*` environment variables; see [`config`].

pub mod config;
pub mod error;
pub mod imposters;
pub mod matchers;
pub mod server;
pub mod version;

pub use config::MbtestConfig;
pub use error::{MountebankError, Result};
pub use server::MountebankServer;
pub use version::Version;
