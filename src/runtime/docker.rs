use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use tracing::info;

use super::Container;
use super::ContainerRuntime;
use crate::constants::PS_FORMAT;
use crate::CommandError;
use crate::CommandRunner;
use crate::ControlPlaneConfig;
use crate::DockerConfig;
use crate::Invocation;
use crate::Result;

/// [`ContainerRuntime`] driving the `docker` CLI
pub struct DockerCli {
    runner: Arc<dyn CommandRunner>,
    bin: String,
    compose_file: PathBuf,
    project: Option<String>,
    control_container: String,
    root_token_command: Vec<String>,
}

impl DockerCli {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        docker: &DockerConfig,
        control_plane: &ControlPlaneConfig,
    ) -> Self {
        let mut root_token_command = vec![control_plane.cli_bin.clone()];
        root_token_command.extend(control_plane.root_token_args.iter().cloned());

        Self {
            runner,
            bin: docker.bin.clone(),
            compose_file: docker.compose_file.clone(),
            project: docker.project_name.clone(),
            control_container: docker.control_container.clone(),
            root_token_command,
        }
    }

    /// Explicit project name, `None` when compose resolves it
    pub fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    fn docker(&self) -> Invocation {
        Invocation::new(&self.bin)
    }

    fn compose_invocation(
        &self,
        args: Vec<String>,
    ) -> Invocation {
        let invocation = self
            .docker()
            .arg("compose")
            .arg("-f")
            .arg(self.compose_file.to_string_lossy());
        let invocation = match &self.project {
            Some(project) => invocation.arg("-p").arg(project),
            None => invocation,
        };
        invocation.args(args)
    }

    async fn run(
        &self,
        invocation: Invocation,
    ) -> Result<String> {
        self.runner.run(invocation).await
    }
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn compose(
        &self,
        args: Vec<String>,
    ) -> Result<String> {
        self.run(self.compose_invocation(args)).await
    }

    async fn compose_up(&self) -> Result<()> {
        info!("Bringing up {}", self.compose_file.display());
        self.compose(vec!["up".into(), "-d".into()]).await?;
        Ok(())
    }

    async fn compose_restart(
        &self,
        services: Vec<String>,
    ) -> Result<()> {
        info!("Restarting services {:?}", services);
        let mut args = vec!["restart".to_string()];
        args.extend(services);
        self.compose(args).await?;
        Ok(())
    }

    async fn compose_exec(
        &self,
        service: &str,
        args: Vec<String>,
    ) -> Result<String> {
        let mut full = vec!["exec".to_string(), "-T".to_string(), service.to_string()];
        full.extend(args);
        self.compose(full).await
    }

    async fn list_containers(
        &self,
        filters: Vec<String>,
    ) -> Result<Vec<Container>> {
        let mut args = vec!["ps".to_string(), "-a".to_string()];
        for filter in filters {
            args.push("--filter".to_string());
            args.push(format!("label={filter}"));
        }
        args.push("--format".to_string());
        args.push(PS_FORMAT.to_string());

        let stdout = self.compose(args).await?;
        let containers = parse_ps_output(&stdout);
        debug!(
            "{} lists {} containers",
            self.compose_file.display(),
            containers.len()
        );
        Ok(containers)
    }

    async fn inspect_container(
        &self,
        name_or_id: &str,
    ) -> Result<serde_json::Value> {
        let invocation = self.docker().arg("inspect").arg(name_or_id);
        let command = invocation.to_string();
        let stdout = self.run(invocation).await?;

        let entries: Vec<serde_json::Value> = serde_json::from_str(&stdout)?;
        entries.into_iter().next().ok_or_else(|| {
            CommandError::UnexpectedOutput {
                command,
                reason: "inspect returned an empty array".to_string(),
            }
            .into()
        })
    }

    async fn kill_container(
        &self,
        id: &str,
    ) -> Result<()> {
        info!("Killing container {}", id);
        self.run(self.docker().arg("kill").arg(id)).await?;
        Ok(())
    }

    async fn start_container(
        &self,
        id: &str,
    ) -> Result<()> {
        info!("Starting container {}", id);
        self.run(self.docker().arg("start").arg(id)).await?;
        Ok(())
    }

    async fn disconnect_container(
        &self,
        id: &str,
        network: &str,
    ) -> Result<()> {
        info!("Disconnecting container {} from {}", id, network);
        self.run(self.docker().args(["network", "disconnect", network, id])).await?;
        Ok(())
    }

    async fn connect_container(
        &self,
        id: &str,
        network: &str,
    ) -> Result<()> {
        info!("Connecting container {} to {}", id, network);
        self.run(self.docker().args(["network", "connect", network, id])).await?;
        Ok(())
    }

    async fn generate_root_token(&self) -> Result<String> {
        let stdout = self
            .compose_exec(&self.control_container, self.root_token_command.clone())
            .await?;
        Ok(stdout.trim().to_string())
    }
}

/// Parses `<id> <name>` lines; lines with fewer than two columns are skipped.
pub(crate) fn parse_ps_output(stdout: &str) -> Vec<Container> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut cols = line.split_whitespace();
            match (cols.next(), cols.next()) {
                (Some(id), Some(name)) => Some(Container::new(id, name)),
                _ => None,
            }
        })
        .collect()
}
