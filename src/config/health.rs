use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HealthConfig {
    /// Port the node's HTTP API listens on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Liveness route
    #[serde(default = "default_path")]
    pub path: String,

    /// Per-ping timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            path: default_path(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl HealthConfig {
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(Error::Config(ConfigError::Message(
                "health.port must be non-zero".into(),
            )));
        }

        if !self.path.starts_with('/') {
            return Err(Error::Config(ConfigError::Message(format!(
                "health.path must start with '/', got {:?}",
                self.path
            ))));
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_port() -> u16 {
    3000
}
fn default_path() -> String {
    "/v1/ping".to_string()
}
fn default_timeout_ms() -> u64 {
    1000
}
