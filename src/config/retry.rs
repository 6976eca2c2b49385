use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Basic retry policy template
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct RetrySpec {
    /// Maximum number of attempts (1 means a single attempt, no retry)
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Fixed pause between attempts (unit: milliseconds)
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl Default for RetrySpec {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            delay_ms: default_delay_ms(),
        }
    }
}

impl RetrySpec {
    pub fn new(
        max_retries: usize,
        delay: Duration,
    ) -> Self {
        Self {
            max_retries,
            delay_ms: delay.as_millis() as u64,
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    fn validate(
        &self,
        name: &str,
    ) -> Result<()> {
        if self.max_retries == 0 {
            return Err(Error::Config(ConfigError::Message(format!(
                "retry.{name}.max_retries must be at least 1"
            ))));
        }
        Ok(())
    }
}

/// Divide strategies by harness operation
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RetryPolicies {
    /// Health-probe writes sent while an election may be in flight
    #[serde(default = "default_write")]
    pub write: RetrySpec,

    /// Read-back of a health-probe write
    #[serde(default = "default_read_back")]
    pub read_back: RetrySpec,

    /// Leader change polling (attempts and interval)
    #[serde(default = "default_leader_change")]
    pub leader_change: RetrySpec,

    /// HTTP pings while a node comes back
    #[serde(default = "default_health")]
    pub health: RetrySpec,
}

impl Default for RetryPolicies {
    fn default() -> Self {
        Self {
            write: default_write(),
            read_back: default_read_back(),
            leader_change: default_leader_change(),
            health: default_health(),
        }
    }
}

impl RetryPolicies {
    pub fn validate(&self) -> Result<()> {
        self.write.validate("write")?;
        self.read_back.validate("read_back")?;
        self.leader_change.validate("leader_change")?;
        self.health.validate("health")?;
        Ok(())
    }
}

fn default_max_retries() -> usize {
    3
}
fn default_delay_ms() -> u64 {
    2000
}
fn default_write() -> RetrySpec {
    RetrySpec {
        max_retries: 3,
        delay_ms: 2000,
    }
}
fn default_read_back() -> RetrySpec {
    RetrySpec {
        max_retries: 3,
        delay_ms: 1000,
    }
}
fn default_leader_change() -> RetrySpec {
    RetrySpec {
        max_retries: 10,
        delay_ms: 2000,
    }
}
fn default_health() -> RetrySpec {
    RetrySpec {
        max_retries: 15,
        delay_ms: 1000,
    }
}
