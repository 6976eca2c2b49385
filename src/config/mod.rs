//! Configuration management for the replication harness.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Configuration file support
//! - Environment variable overrides
//! - Component-wise validation
mod control_plane;
mod docker;
mod health;
mod probe;
mod retry;
pub use control_plane::*;
pub use docker::*;
pub use health::*;
pub use probe::*;
pub use retry::*;

use std::env;

use config::Config;
use config::ConfigBuilder;
use config::Environment;
use config::File;
use config::builder::DefaultState;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::ENV_COMPOSE_FILE;
use crate::constants::ENV_CONFIG_PATH;
use crate::constants::ENV_CONTROL_DB_CONTAINER;
use crate::constants::ENV_DOCKER_NETWORK_NAME;
use crate::constants::ENV_PREFIX;
use crate::constants::ENV_SPACETIME_BIN;
use crate::constants::ENV_SPACETIME_CLI_BIN;
use crate::Result;

/// Main configuration container for the harness
///
/// Combines all component configurations with hierarchical override support:
/// 1. Default values from code implementation
/// 2. Configuration file specified by `CONFIG_PATH`
/// 3. `HARNESS__<SECTION>__<KEY>` environment variables
/// 4. Flat variables `DOCKER_NETWORK_NAME`, `CONTROL_DB_CONTAINER`,
///    `SPACETIME_CLI_BIN`, `SPACETIME_BIN` and `COMPOSE_FILE` (highest priority)
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct HarnessConfig {
    /// Container runtime and compose project
    #[serde(default)]
    pub docker: DockerConfig,
    /// Database CLI and control database
    #[serde(default)]
    pub control_plane: ControlPlaneConfig,
    /// Retry policies for operations racing cluster reconfiguration
    #[serde(default)]
    pub retry: RetryPolicies,
    /// Leader health probe
    #[serde(default)]
    pub probe: ProbeConfig,
    /// HTTP liveness endpoint of the nodes
    #[serde(default)]
    pub health: HealthConfig,
}

impl HarnessConfig {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// # Note
    /// Validation is deferred so that further overrides can be applied via
    /// `with_override_config()`. Callers MUST call `validate()` before use.
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("CONFIG_PATH", "harness.toml");
    /// std::env::set_var("HARNESS__RETRY__WRITE__MAX_RETRIES", "5");
    /// let cfg = HarnessConfig::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var(ENV_CONFIG_PATH) {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        let config: Self = with_env_overrides(builder)?.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Applies additional configuration overrides from file without validation.
    ///
    /// Merging order (later sources override earlier):
    /// 1. Current configuration values
    /// 2. New configuration file
    /// 3. Latest environment variables (highest priority)
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let builder = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path));

        let config: Self = with_env_overrides(builder)?.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validates configuration and returns validated instance.
    pub fn validate(self) -> Result<Self> {
        self.docker.validate()?;
        self.control_plane.validate()?;
        self.retry.validate()?;
        self.probe.validate()?;
        self.health.validate()?;
        Ok(self)
    }
}

fn with_env_overrides(
    builder: ConfigBuilder<DefaultState>
) -> Result<ConfigBuilder<DefaultState>> {
    let builder = builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        )
        .set_override_option("docker.network_name", non_empty_var(ENV_DOCKER_NETWORK_NAME))?
        .set_override_option(
            "docker.control_container",
            non_empty_var(ENV_CONTROL_DB_CONTAINER),
        )?
        .set_override_option("docker.compose_file", non_empty_var(ENV_COMPOSE_FILE))?
        .set_override_option("control_plane.cli_bin", non_empty_var(ENV_SPACETIME_CLI_BIN))?
        .set_override_option("control_plane.client_bin", non_empty_var(ENV_SPACETIME_BIN))?;
    Ok(builder)
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
