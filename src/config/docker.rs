use std::path::PathBuf;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Container runtime and compose project the harness perturbs
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DockerConfig {
    /// Container runtime CLI
    #[serde(default = "default_bin")]
    pub bin: String,

    /// Compose file defining the cluster
    #[serde(default = "default_compose_file")]
    pub compose_file: PathBuf,

    /// Compose project name passed as `-p`. When unset, compose resolves the
    /// project itself (`COMPOSE_PROJECT_NAME`, the file's `name:`, its directory).
    #[serde(default)]
    pub project_name: Option<String>,

    /// Network nodes are disconnected from and reconnected to
    #[serde(default = "default_network_name")]
    pub network_name: String,

    /// Compose service hosting the control database
    #[serde(default = "default_control_container")]
    pub control_container: String,

    /// Substring identifying follower-capable node containers
    #[serde(default = "default_follower_pattern")]
    pub follower_pattern: String,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            bin: default_bin(),
            compose_file: default_compose_file(),
            project_name: None,
            network_name: default_network_name(),
            control_container: default_control_container(),
            follower_pattern: default_follower_pattern(),
        }
    }
}

impl DockerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.bin.trim().is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "docker.bin cannot be empty".into(),
            )));
        }

        if self.compose_file.as_os_str().is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "docker.compose_file cannot be empty".into(),
            )));
        }

        if self.network_name.trim().is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "docker.network_name cannot be empty".into(),
            )));
        }

        if let Some(name) = &self.project_name {
            if !is_valid_project_name(name) {
                return Err(Error::Config(ConfigError::Message(format!(
                    "docker.project_name {name:?} must be lowercase [a-z0-9_-] and start with a letter or digit"
                ))));
            }
        }

        Ok(())
    }
}

/// Compose accepts lowercase alphanumerics, `-` and `_`, starting with a letter or digit.
fn is_valid_project_name(name: &str) -> bool {
    name.starts_with(|c: char| c.is_ascii_lowercase() || c.is_ascii_digit())
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

fn default_bin() -> String {
    "docker".to_string()
}
fn default_compose_file() -> PathBuf {
    PathBuf::from("docker-compose.yml")
}
fn default_network_name() -> String {
    "private_spacetime_cloud".to_string()
}
fn default_control_container() -> String {
    "node".to_string()
}
fn default_follower_pattern() -> String {
    "worker".to_string()
}
