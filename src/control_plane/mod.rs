//! Typed access to the cluster-wide control database.
//!
//! Queries go through the database CLI, whose text output is parsed into a
//! [`Table`] and then decoded into one record type per query.

mod cli;
mod queries;
mod table;
pub use cli::*;
pub use queries::*;
pub use table::*;


use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde_json::Value;
use tracing::debug;
use tracing::info;

use crate::constants::CREATE_ADMIN_REDUCER;
use crate::ControlPlaneConfig;
use crate::DatabaseIdentity;
use crate::Result;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ControlPlane: Send + Sync + 'static {
    /// Internal id of the database with this identity, if registered.
    async fn database_id(
        &self,
        identity: &DatabaseIdentity,
    ) -> Result<Option<u64>>;

    async fn replicas(
        &self,
        database_id: u64,
    ) -> Result<Vec<Replica>>;

    /// Replica currently leading the database, if one is elected.
    async fn leader_replica(
        &self,
        database_id: u64,
    ) -> Result<Option<u64>>;

    async fn replica_node(
        &self,
        replica_id: u64,
    ) -> Result<Option<u64>>;

    /// `host:port` the node advertises, if any.
    async fn node_address(
        &self,
        node_id: u64,
    ) -> Result<Option<String>>;

    /// Calls a reducer of the control database itself.
    async fn call(
        &self,
        reducer: &str,
        args: Vec<Value>,
    ) -> Result<()>;

    /// Hex identity the harness's own CLI login acts as.
    async fn current_identity(&self) -> Result<String>;

    /// Logs `root_token` in and, as root, makes `identity` an admin of the
    /// control database.
    async fn grant_admin(
        &self,
        root_token: &str,
        identity: &str,
    ) -> Result<()>;
}

/// [`ControlPlane`] backed by the database CLI
///
/// Root actions go through a second CLI config so the harness's own login is
/// left untouched.
pub struct ControlPlaneClient {
    cli: SpacetimeCli,
    root_cli: SpacetimeCli,
    database: String,
}

impl ControlPlaneClient {
    pub fn new(
        cli: SpacetimeCli,
        config: &ControlPlaneConfig,
    ) -> Self {
        Self {
            root_cli: cli.with_config_file(&config.root_config_file),
            cli,
            database: config.control_database.clone(),
        }
    }

    async fn query(
        &self,
        sql: String,
    ) -> Result<Table> {
        self.cli.sql(&self.database, &sql).await
    }
}

#[async_trait]
impl ControlPlane for ControlPlaneClient {
    async fn database_id(
        &self,
        identity: &DatabaseIdentity,
    ) -> Result<Option<u64>> {
        let row: Option<DatabaseIdRow> = self.query(database_id_sql(identity)).await?.decode_first()?;
        Ok(row.map(|r| r.id))
    }

    async fn replicas(
        &self,
        database_id: u64,
    ) -> Result<Vec<Replica>> {
        self.query(replicas_sql(database_id)).await?.decode()
    }

    async fn leader_replica(
        &self,
        database_id: u64,
    ) -> Result<Option<u64>> {
        let row: Option<LeaderRow> = self.query(leader_sql(database_id)).await?.decode_first()?;
        Ok(row.map(|r| r.leader))
    }

    async fn replica_node(
        &self,
        replica_id: u64,
    ) -> Result<Option<u64>> {
        let row: Option<ReplicaNodeRow> = self
            .query(replica_node_sql(replica_id))
            .await?
            .decode_first()?;
        Ok(row.map(|r| r.node_id))
    }

    async fn node_address(
        &self,
        node_id: u64,
    ) -> Result<Option<String>> {
        let row: Option<NodeAddressRow> = self
            .query(node_address_sql(node_id))
            .await?
            .decode_first()?;
        Ok(row.and_then(|r| r.network_addr))
    }

    async fn call(
        &self,
        reducer: &str,
        args: Vec<Value>,
    ) -> Result<()> {
        debug!("[{}] call {} {:?}", self.database, reducer, args);
        self.cli.call(&self.database, reducer, &args).await?;
        Ok(())
    }

    async fn current_identity(&self) -> Result<String> {
        self.cli.logged_in_identity().await
    }

    async fn grant_admin(
        &self,
        root_token: &str,
        identity: &str,
    ) -> Result<()> {
        self.root_cli.login_with_token(root_token).await?;
        self.root_cli
            .call_raw(
                &self.database,
                CREATE_ADMIN_REDUCER,
                &[format!("0x{identity}")],
            )
            .await?;
        info!("Granted admin rights to 0x{}", identity);
        Ok(())
    }
}
