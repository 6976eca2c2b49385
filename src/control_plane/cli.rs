use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use super::Table;
use crate::constants::ENV_SPACETIME_CONFIG_FILE;
use crate::CommandError;
use crate::CommandRunner;
use crate::ControlPlaneConfig;
use crate::Invocation;
use crate::Result;

/// Thin wrapper over the database CLI's `sql`, `call` and `login` subcommands
#[derive(Clone)]
pub struct SpacetimeCli {
    runner: Arc<dyn CommandRunner>,
    bin: String,
    config_file: Option<PathBuf>,
}

impl SpacetimeCli {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        config: &ControlPlaneConfig,
    ) -> Self {
        Self {
            runner,
            bin: config.client_bin.clone(),
            config_file: config.config_file.clone(),
        }
    }

    /// Same CLI pointed at another config file, e.g. one holding a root login.
    pub fn with_config_file(
        &self,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            runner: self.runner.clone(),
            bin: self.bin.clone(),
            config_file: Some(path.into()),
        }
    }

    fn invocation(&self) -> Invocation {
        let invocation = Invocation::new(&self.bin);
        match &self.config_file {
            Some(path) => invocation.env(ENV_SPACETIME_CONFIG_FILE, path.to_string_lossy()),
            None => invocation,
        }
    }

    /// `<cli> sql <database> <query>`
    pub async fn sql(
        &self,
        database: &str,
        query: &str,
    ) -> Result<Table> {
        let stdout = self
            .runner
            .run(self.invocation().arg("sql").arg(database).arg(query))
            .await?;
        let table = Table::parse(&stdout);
        debug!("[{}] {} -> {} rows", database, query, table.len());
        Ok(table)
    }

    /// `<cli> call -- <database> <reducer> <json args...>`
    pub async fn call(
        &self,
        database: &str,
        reducer: &str,
        args: &[serde_json::Value],
    ) -> Result<String> {
        let args = args
            .iter()
            .map(serde_json::to_string)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        self.call_raw(database, reducer, &args).await
    }

    /// Like [`Self::call`], with arguments passed through verbatim.
    pub async fn call_raw(
        &self,
        database: &str,
        reducer: &str,
        args: &[String],
    ) -> Result<String> {
        let invocation = self
            .invocation()
            .arg("call")
            .arg("--")
            .arg(database)
            .arg(reducer)
            .args(args);
        self.runner.run(invocation).await
    }

    /// `<cli> login --token <token>`
    pub async fn login_with_token(
        &self,
        token: &str,
    ) -> Result<()> {
        self.runner
            .run(self.invocation().arg("login").arg("--token").arg(token))
            .await?;
        Ok(())
    }

    /// Hex identity of the logged-in user, the last word of `<cli> login show`.
    pub async fn logged_in_identity(&self) -> Result<String> {
        let invocation = self.invocation().arg("login").arg("show");
        let command = invocation.to_string();
        let stdout = self.runner.run(invocation).await?;

        let identity = stdout
            .split_whitespace()
            .last()
            .map(|word| word.trim_start_matches("0x").to_ascii_lowercase())
            .filter(|hex| !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit()));

        identity.ok_or_else(|| {
            CommandError::UnexpectedOutput {
                command,
                reason: format!("no identity in {:?}", stdout.trim()),
            }
            .into()
        })
    }
}
