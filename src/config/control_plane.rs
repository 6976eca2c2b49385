use std::path::PathBuf;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Database CLIs used for control-plane queries, database writes and
/// admin bootstrap
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ControlPlaneConfig {
    /// Host-side CLI running `sql`, `call` and `login`
    #[serde(default = "default_client_bin")]
    pub client_bin: String,

    /// Cloud CLI inside the control container, used to mint root tokens
    #[serde(default = "default_cli_bin")]
    pub cli_bin: String,

    /// Name of the cluster-wide control database
    #[serde(default = "default_control_database")]
    pub control_database: String,

    /// Exported to the CLI as `SPACETIME_CONFIG_FILE` when set
    #[serde(default)]
    pub config_file: Option<PathBuf>,

    /// Separate CLI config the root token is logged into
    #[serde(default = "default_root_config_file")]
    pub root_config_file: PathBuf,

    /// Arguments passed to `cli_bin` inside the control container to mint a root token
    #[serde(default = "default_root_token_args")]
    pub root_token_args: Vec<String>,
}

impl Default for ControlPlaneConfig {
    fn default() -> Self {
        Self {
            client_bin: default_client_bin(),
            cli_bin: default_cli_bin(),
            control_database: default_control_database(),
            config_file: None,
            root_config_file: default_root_config_file(),
            root_token_args: default_root_token_args(),
        }
    }
}

impl ControlPlaneConfig {
    pub fn validate(&self) -> Result<()> {
        if self.client_bin.trim().is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "control_plane.client_bin cannot be empty".into(),
            )));
        }

        if self.cli_bin.trim().is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "control_plane.cli_bin cannot be empty".into(),
            )));
        }

        if self.control_database.trim().is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "control_plane.control_database cannot be empty".into(),
            )));
        }

        if self.root_config_file.as_os_str().is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "control_plane.root_config_file cannot be empty".into(),
            )));
        }

        Ok(())
    }
}

fn default_client_bin() -> String {
    "spacetime".to_string()
}
fn default_cli_bin() -> String {
    "spacetimedb-cloud".to_string()
}
fn default_control_database() -> String {
    "spacetime-control".to_string()
}
fn default_root_config_file() -> PathBuf {
    PathBuf::from("root_config.toml")
}
fn default_root_token_args() -> Vec<String> {
    vec!["generate-root-token".to_string()]
}
