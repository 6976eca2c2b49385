//! Leader observation and failure injection.
//!
//! [`ClusterObserver`] joins control database state with the container
//! runtime to answer "which container is the leader" and to take that
//! container out or bring it back. Leader facts are recomputed on every
//! call; nothing is cached between calls.

mod resolver;
mod types;
pub use resolver::*;
pub use types::*;


use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::time::sleep;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::utils::net::host_of;
use crate::ContainerRuntime;
use crate::ControlPlane;
use crate::ControlPlaneClient;
use crate::DatabaseClient;
use crate::DatabaseIdentity;
use crate::DockerCli;
use crate::Error;
use crate::HarnessConfig;
use crate::HealthCheck;
use crate::HttpPing;
use crate::LeaderError;
use crate::ProbeConfig;
use crate::ProbeError;
use crate::ProcessRunner;
use crate::Replica;
use crate::Result;
use crate::RetryOutcome;
use crate::RetryPolicy;
use crate::SpacetimeCli;
use crate::SpacetimeDatabase;

pub struct ClusterObserver {
    runtime: Arc<dyn ContainerRuntime>,
    control_plane: Arc<dyn ControlPlane>,
    database: Arc<dyn DatabaseClient>,
    health: Arc<dyn HealthCheck>,
    identity: DatabaseIdentity,
    resolver: ContainerResolver,

    network_name: String,
    follower_pattern: String,
    probe: ProbeConfig,

    write_policy: RetryPolicy,
    read_back_policy: RetryPolicy,
    leader_change_policy: RetryPolicy,
    health_policy: RetryPolicy,
}

impl ClusterObserver {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        control_plane: Arc<dyn ControlPlane>,
        database: Arc<dyn DatabaseClient>,
        health: Arc<dyn HealthCheck>,
        identity: DatabaseIdentity,
        config: &HarnessConfig,
    ) -> Self {
        Self {
            runtime,
            control_plane,
            database,
            health,
            identity,
            resolver: ContainerResolver::default(),
            network_name: config.docker.network_name.clone(),
            follower_pattern: config.docker.follower_pattern.clone(),
            probe: config.probe.clone(),
            write_policy: RetryPolicy::from(&config.retry.write),
            read_back_policy: RetryPolicy::from(&config.retry.read_back),
            leader_change_policy: RetryPolicy::from(&config.retry.leader_change),
            health_policy: RetryPolicy::from(&config.retry.health),
        }
    }

    /// Wires the CLI-backed implementations of every dependency.
    pub fn from_config(
        identity: DatabaseIdentity,
        config: &HarnessConfig,
    ) -> Result<Self> {
        let runner = Arc::new(ProcessRunner);
        let cli = SpacetimeCli::new(runner.clone(), &config.control_plane);

        let runtime = Arc::new(DockerCli::new(runner, &config.docker, &config.control_plane));
        let control_plane = Arc::new(ControlPlaneClient::new(cli.clone(), &config.control_plane));
        let database = Arc::new(SpacetimeDatabase::new(cli, identity.clone()));
        let health = Arc::new(HttpPing::new(&config.health)?);

        Ok(Self::new(runtime, control_plane, database, health, identity, config))
    }

    pub fn with_resolver(
        mut self,
        resolver: ContainerResolver,
    ) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn runtime(&self) -> &Arc<dyn ContainerRuntime> {
        &self.runtime
    }

    pub fn identity(&self) -> &DatabaseIdentity {
        &self.identity
    }

    // ---------------------------------------------------------------------
    // Cluster facts

    /// Internal id of the database under test.
    pub async fn get_db_id(&self) -> Result<u64> {
        self.control_plane
            .database_id(&self.identity)
            .await?
            .ok_or_else(|| {
                LeaderError::UnknownDatabase {
                    identity: self.identity.to_string(),
                }
                .into()
            })
    }

    pub async fn get_all_replicas(&self) -> Result<Vec<Replica>> {
        let db_id = self.get_db_id().await?;
        self.control_plane.replicas(db_id).await
    }

    pub async fn replica_count(&self) -> Result<usize> {
        Ok(self.get_all_replicas().await?.len())
    }

    /// First replica not hosted on `leader_node_id`
    pub async fn follower_replica(
        &self,
        leader_node_id: u64,
    ) -> Result<Option<Replica>> {
        Ok(self
            .get_all_replicas()
            .await?
            .into_iter()
            .find(|r| r.node_id != leader_node_id))
    }

    /// Node hosting the leader replica. Touches the control database only.
    async fn leader_node_id(&self) -> Result<u64> {
        let db_id = self.get_db_id().await?;

        let replica_id = self
            .control_plane
            .leader_replica(db_id)
            .await?
            .ok_or(LeaderError::NoLeader {
                stage: "leader replica",
            })?;

        let node_id = self
            .control_plane
            .replica_node(replica_id)
            .await?
            .ok_or(LeaderError::NoLeader { stage: "leader node" })?;

        Ok(node_id)
    }

    pub async fn get_leader_info(&self) -> Result<LeaderInfo> {
        let node_id = self.leader_node_id().await?;

        let address = self
            .control_plane
            .node_address(node_id)
            .await?
            .ok_or(LeaderError::NoLeader {
                stage: "leader network address",
            })?;
        let hostname = host_of(&address).to_string();

        let containers = if self.resolver.needs_listing() {
            self.runtime.list_containers(vec![]).await?
        } else {
            vec![]
        };
        let container_id = self.resolver.resolve(node_id, &hostname, &containers);

        debug!(node_id, %hostname, ?container_id, "resolved leader");
        Ok(LeaderInfo {
            node_id,
            hostname,
            container_id,
        })
    }

    // ---------------------------------------------------------------------
    // Waiting

    /// Polls until the leader sits on a node other than `previous`.
    ///
    /// `previous = None` waits for any leader at all. Transient failures
    /// count as "unchanged". Returns `None` once `max_attempts` polls saw no
    /// change; sleeps only between polls.
    pub async fn wait_for_leader_change(
        &self,
        previous: Option<u64>,
        max_attempts: usize,
        delay: Duration,
    ) -> Result<Option<u64>> {
        for attempt in 1..=max_attempts {
            match self.leader_node_id().await {
                Ok(node_id) if Some(node_id) != previous => {
                    info!(attempt, ?previous, "Leader is now on node {}", node_id);
                    return Ok(Some(node_id));
                }
                Ok(node_id) => {
                    debug!(attempt, "leader still on node {}", node_id);
                }
                Err(e) if e.is_transient() => {
                    debug!(attempt, "no leader observed: {}", e);
                }
                Err(e) => return Err(e),
            }

            if attempt < max_attempts {
                sleep(delay).await;
            }
        }

        warn!(?previous, "no leader change after {} polls", max_attempts);
        Ok(None)
    }

    /// [`wait_for_leader_change`](Self::wait_for_leader_change) with the
    /// configured leader change policy.
    pub async fn wait_for_leader(
        &self,
        previous: Option<u64>,
    ) -> Result<Option<u64>> {
        self.wait_for_leader_change(
            previous,
            self.leader_change_policy.max_retries(),
            self.leader_change_policy.delay(),
        )
        .await
    }

    // ---------------------------------------------------------------------
    // Probing

    /// Writes row `id` through the leader and reads it back.
    ///
    /// The write may race an election, so its exhaustion is only logged; the
    /// read-back is what decides. Fails with [`ProbeError::RowMissing`] when
    /// the row never shows up.
    pub async fn ensure_leader_health(
        &self,
        id: u64,
    ) -> Result<()> {
        if let Some(delay) = self.probe.settle_delay() {
            sleep(delay).await;
        }

        let write = self
            .write_policy
            .run(|| {
                self.database
                    .call(&self.probe.write_reducer, vec![json!(id), json!(1)])
            })
            .await;
        match write {
            RetryOutcome::Ok(()) => debug!("probe write {} accepted", id),
            RetryOutcome::StillPending { attempts, last_error } => {
                warn!(attempts, "probe write {} not confirmed: {}", id, last_error)
            }
            RetryOutcome::Failed { attempts, error } => {
                warn!(attempts, "probe write {} failed: {}", id, error)
            }
        }

        match self.read_back_policy.run(|| self.expect_row(id)).await {
            RetryOutcome::Ok(()) => {
                info!("Row {} present in {}", id, self.probe.table);
                Ok(())
            }
            RetryOutcome::StillPending { .. } => Err(self.row_missing(id)),
            RetryOutcome::Failed { error, .. } => Err(error),
        }
    }

    /// Whether row `id` of the probe table is readable.
    pub async fn row_exists(
        &self,
        id: u64,
    ) -> Result<bool> {
        let query = format!(
            "SELECT {col} FROM {table} WHERE {col}={id}",
            col = self.probe.id_column,
            table = self.probe.table,
        );
        let table = self.database.sql(&query).await?;

        for row in table.rows() {
            if row.int(&self.probe.id_column)? == id {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn expect_row(
        &self,
        id: u64,
    ) -> Result<()> {
        if self.row_exists(id).await? {
            Ok(())
        } else {
            Err(self.row_missing(id))
        }
    }

    fn row_missing(
        &self,
        id: u64,
    ) -> Error {
        ProbeError::RowMissing {
            id,
            table: self.probe.table.clone(),
        }
        .into()
    }

    /// Sends one write through the configured message reducer.
    pub async fn send_message(
        &self,
        text: &str,
    ) -> Result<()> {
        self.database
            .call(&self.probe.message_reducer, vec![json!(text)])
            .await
    }

    /// Writes until one is rejected.
    ///
    /// Returns the 0-based index of the first rejected write, or `None` when
    /// all `max_writes` were accepted.
    pub async fn write_until_rejected(
        &self,
        max_writes: usize,
    ) -> Result<Option<usize>> {
        for i in 0..max_writes {
            match self.send_message("terminal").await {
                Ok(()) => {}
                Err(e) if e.is_transient() => {
                    info!("Write {} rejected: {}", i, e);
                    return Ok(Some(i));
                }
                Err(e) => return Err(e),
            }
        }
        warn!("All {} writes accepted", max_writes);
        Ok(None)
    }

    // ---------------------------------------------------------------------
    // Failure injection

    /// Kills or disconnects the leader's container and returns its id.
    pub async fn fail_leader(
        &self,
        action: FailureAction,
    ) -> Result<String> {
        let leader = self.get_leader_info().await?;
        let container_id = leader.container_id.ok_or(LeaderError::ContainerNotFound {
            hostname: leader.hostname.clone(),
        })?;

        info!(
            node_id = leader.node_id,
            "Failing leader container {} ({})", container_id, action
        );
        match action {
            FailureAction::Kill => self.runtime.kill_container(&container_id).await?,
            FailureAction::Disconnect => {
                self.runtime
                    .disconnect_container(&container_id, &self.network_name)
                    .await?
            }
        }

        Ok(container_id)
    }

    pub async fn restore_leader(
        &self,
        container_id: &str,
        action: RecoveryAction,
    ) -> Result<()> {
        info!("Restoring container {} ({})", container_id, action);
        match action {
            RecoveryAction::Start => self.runtime.start_container(container_id).await,
            RecoveryAction::Connect => {
                self.runtime
                    .connect_container(container_id, &self.network_name)
                    .await
            }
        }
    }

    /// Kills every follower container, leaving the leader without a quorum.
    pub async fn fail_followers(&self) -> Result<Vec<String>> {
        let leader = self.get_leader_info().await?;
        let leader_container = leader.container_id.ok_or(LeaderError::ContainerNotFound {
            hostname: leader.hostname.clone(),
        })?;

        let mut killed = Vec::new();
        for container in self.runtime.list_containers(vec![]).await? {
            if container.id == leader_container || !container.name.contains(&self.follower_pattern) {
                continue;
            }
            self.runtime.kill_container(&container.id).await?;
            killed.push(container.id);
        }

        info!("Killed {} followers of leader {}", killed.len(), leader_container);
        Ok(killed)
    }

    /// Makes the harness's own CLI identity an admin of the control database,
    /// using a root token minted in the control container. Returns the
    /// promoted identity.
    pub async fn add_admin(&self) -> Result<String> {
        let root_token = self.runtime.generate_root_token().await?;
        let identity = self.control_plane.current_identity().await?;
        self.control_plane.grant_admin(&root_token, &identity).await?;
        Ok(identity)
    }

    /// Asks the control database to move leadership to `replica_id`.
    /// Needs admin rights, see [`Self::add_admin`].
    pub async fn prefer_leader(
        &self,
        replica_id: u64,
    ) -> Result<()> {
        info!("Preferring replica {} as leader", replica_id);
        self.control_plane
            .call("prefer_leader", vec![json!(replica_id)])
            .await
    }

    // ---------------------------------------------------------------------
    // Liveness

    pub async fn ping_leader(&self) -> Result<()> {
        let leader = self.get_leader_info().await?;
        self.health.ping(&leader.hostname).await
    }

    /// Pings `hostname` under the health policy. `false` when it never
    /// answered.
    pub async fn wait_for_node_healthy(
        &self,
        hostname: &str,
    ) -> Result<bool> {
        match self.health_policy.run(|| self.health.ping(hostname)).await {
            RetryOutcome::Ok(()) => Ok(true),
            RetryOutcome::StillPending { .. } => Ok(false),
            RetryOutcome::Failed { error, .. } => Err(error),
        }
    }

    /// Brings every service of the compose project back up.
    pub async fn ensure_cluster_up(&self) -> Result<()> {
        self.runtime.compose_up().await
    }
}
