//! Container lifecycle operations against the compose project hosting the
//! cluster.
//!
//! Nothing here caches: every call asks the container runtime afresh, so a
//! container killed a moment ago is observed as such.

mod docker;
pub use docker::*;


use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::Serialize;

use crate::Result;

/// A container of the compose project
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Container {
    pub id: String,
    pub name: String,
}

impl Container {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ContainerRuntime: Send + Sync + 'static {
    /// Runs `compose <args>` against the project and returns stdout.
    async fn compose(
        &self,
        args: Vec<String>,
    ) -> Result<String>;

    /// Starts every service of the project, detached.
    async fn compose_up(&self) -> Result<()>;

    async fn compose_restart(
        &self,
        services: Vec<String>,
    ) -> Result<()>;

    /// Runs a command inside a running service without a TTY.
    async fn compose_exec(
        &self,
        service: &str,
        args: Vec<String>,
    ) -> Result<String>;

    /// Lists project containers, stopped ones included.
    ///
    /// Each filter is an additional container label (`key` or `key=value`).
    async fn list_containers(
        &self,
        filters: Vec<String>,
    ) -> Result<Vec<Container>>;

    /// Low-level description of one container.
    async fn inspect_container(
        &self,
        name_or_id: &str,
    ) -> Result<serde_json::Value>;

    async fn kill_container(
        &self,
        id: &str,
    ) -> Result<()>;

    async fn start_container(
        &self,
        id: &str,
    ) -> Result<()>;

    async fn disconnect_container(
        &self,
        id: &str,
        network: &str,
    ) -> Result<()>;

    async fn connect_container(
        &self,
        id: &str,
        network: &str,
    ) -> Result<()>;

    /// Mints a root token from inside the control container.
    async fn generate_root_token(&self) -> Result<String>;
}
