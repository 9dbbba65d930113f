//! HTTP client for the Mountebank admin API

use crate::error::{MountebankError, Result};
use crate::imposters::{Imposter, ImposterDetail};
use crate::version::Version;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Response wrapper for imposter list
#[derive(Debug, Deserialize)]
struct ImpostersResponse {
    #[serde(default)]
    imposters: Vec<Imposter>,
}

/// Error response from the admin API
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// `GET /config`
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub version: Version,
    /// Command line options the server was started with
    #[serde(default)]
    pub options: serde_json::Value,
}

/// HTTP client for the Mountebank admin API
#[derive(Debug, Clone)]
pub struct AdminClient {
    client: Client,
    base_url: String,
}

impl AdminClient {
    /// Create a new admin client for `base_url`, e.g. `http://localhost:2525`
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Get the underlying HTTP client
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether the admin API answers at all
    pub async fn is_ready(&self) -> bool {
        let url = format!("{}/", self.base_url);
        match self
            .client
            .get(&url)
            .timeout(Duration::from_millis(500))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    /// Server version and startup options
    pub async fn config(&self) -> Result<ServerConfig> {
        let url = format!("{}/config", self.base_url);
        let resp = self.send(self.client.get(&url)).await?;

        if !resp.status().is_success() {
            return self.handle_error(resp).await;
        }

        Ok(resp.json().await?)
    }

    /// Create an imposter, returning it as Mountebank reports it (with its assigned port)
    pub async fn create_imposter(&self, imposter: &Imposter) -> Result<ImposterDetail> {
        let url = format!("{}/imposters", self.base_url);
        debug!(port = ?imposter.port, name = ?imposter.name, "Creating imposter");
        let resp = self.send(self.client.post(&url).json(imposter)).await?;

        if !resp.status().is_success() {
            return self.handle_error(resp).await;
        }

        Ok(resp.json().await?)
    }

    /// Get details for a specific imposter, including recorded requests
    pub async fn get_imposter(&self, port: u16) -> Result<ImposterDetail> {
        let url = format!("{}/imposters/{}", self.base_url, port);
        let resp = self.send(self.client.get(&url)).await?;

        if !resp.status().is_success() {
            return self.handle_error(resp).await;
        }

        Ok(resp.json().await?)
    }

    /// List all imposters in replayable form
    pub async fn list_imposters(&self) -> Result<Vec<Imposter>> {
        let url = format!("{}/imposters?replayable=true", self.base_url);
        let resp = self.send(self.client.get(&url)).await?;

        if !resp.status().is_success() {
            return self.handle_error(resp).await;
        }

        let body: ImpostersResponse = resp.json().await?;
        Ok(body.imposters)
    }

    /// Delete an imposter
    pub async fn delete_imposter(&self, port: u16) -> Result<()> {
        let url = format!("{}/imposters/{}", self.base_url, port);
        debug!(port, "Deleting imposter");
        let resp = self.send(self.client.delete(&url)).await?;

        if !resp.status().is_success() {
            return self.handle_error(resp).await;
        }

        Ok(())
    }

    /// Delete every imposter on the server
    pub async fn delete_all_imposters(&self) -> Result<()> {
        let url = format!("{}/imposters", self.base_url);
        debug!("Deleting all imposters");
        let resp = self.send(self.client.delete(&url)).await?;

        if !resp.status().is_success() {
            return self.handle_error(resp).await;
        }

        Ok(())
    }

    /// Clear recorded requests
    pub async fn clear_requests(&self, port: u16) -> Result<()> {
        let url = format!("{}/imposters/{}/savedRequests", self.base_url, port);
        let resp = self.send(self.client.delete(&url)).await?;

        if !resp.status().is_success() {
            return self.handle_error(resp).await;
        }

        Ok(())
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        request.send().await.map_err(|e| {
            if e.is_connect() {
                MountebankError::Connection(format!("Cannot connect to {}", self.base_url))
            } else {
                MountebankError::Request(e)
            }
        })
    }

    /// Handle error responses
    async fn handle_error<T>(&self, resp: reqwest::Response) -> Result<T> {
        let status = resp.status();
        if let Ok(error_body) = resp.json::<ErrorResponse>().await {
            if let Some(err) = error_body.errors.into_iter().next() {
                return Err(MountebankError::Server {
                    code: err.code,
                    message: err.message,
                });
            }
        }
        Err(MountebankError::Server {
            code: status.as_str().to_string(),
            message: format!("Request failed with status {status}"),
        })
    }
}
