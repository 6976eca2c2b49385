//! HTTP liveness of individual nodes.


use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tracing::debug;

use crate::utils::net::ping_url;
use crate::Error;
use crate::HealthConfig;
use crate::HealthError;
use crate::Result;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait HealthCheck: Send + Sync + 'static {
    /// Succeeds when the node at `host` answers its ping route with 200.
    async fn ping(
        &self,
        host: &str,
    ) -> Result<()>;
}

/// `GET http://<host>:<port><path>`
pub struct HttpPing {
    client: reqwest::Client,
    port: u16,
    path: String,
}

impl HttpPing {
    pub fn new(config: &HealthConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::Fatal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            port: config.port,
            path: config.path.clone(),
        })
    }
}

#[async_trait]
impl HealthCheck for HttpPing {
    async fn ping(
        &self,
        host: &str,
    ) -> Result<()> {
        let url = ping_url(host, self.port, &self.path);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| HealthError::Unreachable {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        debug!("{} -> {}", url, status);
        if status != reqwest::StatusCode::OK {
            return Err(HealthError::Unhealthy {
                url,
                status: status.as_u16(),
            }
            .into());
        }
        Ok(())
    }
}
