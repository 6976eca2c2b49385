use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use async_trait::async_trait;
use serde_json::json;
use serde_json::Value;

use crate::ClusterObserver;
use crate::CommandError;
use crate::Container;
use crate::ContainerRuntime;
use crate::ControlPlane;
use crate::DatabaseClient;
use crate::DatabaseIdentity;
use crate::Error;
use crate::HarnessConfig;
use crate::HealthCheck;
use crate::HealthError;
use crate::Replica;
use crate::Result;
use crate::Row;
use crate::Table;

pub const FAKE_IDENTITY: &str = "c200fa4e";
pub const FAKE_DB_ID: u64 = 7;
pub const CONTROL_CONTAINER_ID: &str = "ctl0";
/// Identity the fake CLI login acts as
pub const FAKE_OWNER: &str = "c0ffee01";
pub const FAKE_ROOT_TOKEN: &str = "fake-root-token";

struct FakeNode {
    id: u64,
    hostname: String,
    container: Container,
    running: bool,
    connected: bool,
}

impl FakeNode {
    fn reachable(&self) -> bool {
        self.running && self.connected
    }
}

struct State {
    nodes: Vec<FakeNode>,
    replicas: Vec<Replica>,
    leader: Option<u64>,
    /// Node that lost leadership; never re-elected while a peer is available
    deposed: Option<u64>,
    election_delay: usize,
    polls_without_leader: usize,
    rows: BTreeSet<u64>,
    messages: usize,
    control_failures: usize,
    read_misses: usize,
    admins: BTreeSet<String>,
    actions: Vec<String>,
}

/// In-memory cluster of `worker-N` nodes, one replica each.
///
/// Implements every harness seam so a [`ClusterObserver`] can run full
/// failover scenarios against it. Killing or disconnecting the leader's
/// container deposes it; a new leader is elected once `leader_replica` has
/// been polled `election_delay` times without one, provided a majority of
/// nodes is reachable. Writes need a leader and a reachable majority.
pub struct FakeCluster {
    state: Mutex<State>,
}

impl FakeCluster {
    /// Cluster with `size` nodes, the first one leading.
    pub fn new(size: u64) -> Arc<Self> {
        let nodes = (1..=size)
            .map(|n| FakeNode {
                id: n,
                hostname: format!("worker-{n}"),
                container: Container::new(format!("c{n}"), format!("cloud-worker-{n}-1")),
                running: true,
                connected: true,
            })
            .collect();
        let replicas = (1..=size)
            .map(|n| Replica {
                id: replica_id_of(n),
                node_id: n,
            })
            .collect();

        Arc::new(Self {
            state: Mutex::new(State {
                nodes,
                replicas,
                leader: Some(replica_id_of(1)),
                deposed: None,
                election_delay: 1,
                polls_without_leader: 0,
                rows: BTreeSet::new(),
                messages: 0,
                control_failures: 0,
                read_misses: 0,
                admins: BTreeSet::new(),
                actions: Vec::new(),
            }),
        })
    }

    pub fn identity() -> DatabaseIdentity {
        DatabaseIdentity::parse(FAKE_IDENTITY).unwrap()
    }

    pub fn observer(
        self: &Arc<Self>,
        config: &HarnessConfig,
    ) -> ClusterObserver {
        ClusterObserver::new(
            self.clone(),
            self.clone(),
            self.clone(),
            self.clone(),
            Self::identity(),
            config,
        )
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    // ---- knobs ----

    /// Leaderless `leader_replica` polls before a new leader is elected
    pub fn set_election_delay(
        &self,
        polls: usize,
    ) {
        self.state().election_delay = polls;
    }

    /// The next `n` leader queries fail like a busy control database
    pub fn fail_control_queries(
        &self,
        n: usize,
    ) {
        self.state().control_failures = n;
    }

    /// The next `n` SQL reads return no rows
    pub fn miss_reads(
        &self,
        n: usize,
    ) {
        self.state().read_misses = n;
    }

    // ---- inspection ----

    pub fn leader_node(&self) -> Option<u64> {
        let state = self.state();
        state.leader.and_then(|r| state.node_of_replica(r))
    }

    pub fn container_of(
        &self,
        node_id: u64,
    ) -> String {
        self.state()
            .nodes
            .iter()
            .find(|n| n.id == node_id)
            .map(|n| n.container.id.clone())
            .unwrap()
    }

    pub fn is_running(
        &self,
        container_id: &str,
    ) -> bool {
        self.state()
            .node_by_container(container_id)
            .map(|n| n.running)
            .unwrap_or(false)
    }

    pub fn has_row(
        &self,
        id: u64,
    ) -> bool {
        self.state().rows.contains(&id)
    }

    pub fn messages(&self) -> usize {
        self.state().messages
    }

    pub fn is_admin(
        &self,
        identity: &str,
    ) -> bool {
        self.state().admins.contains(identity)
    }

    /// Container runtime actions taken so far, e.g. `kill c1`
    pub fn actions(&self) -> Vec<String> {
        self.state().actions.clone()
    }
}

fn replica_id_of(node_id: u64) -> u64 {
    node_id + 10
}

fn rejected(stderr: &str) -> Error {
    CommandError::NonZeroExit {
        command: "fake".to_string(),
        code: Some(1),
        stderr: stderr.to_string(),
    }
    .into()
}

impl State {
    fn node_of_replica(
        &self,
        replica_id: u64,
    ) -> Option<u64> {
        self.replicas.iter().find(|r| r.id == replica_id).map(|r| r.node_id)
    }

    fn node_by_container(
        &self,
        container_id: &str,
    ) -> Option<&FakeNode> {
        self.nodes.iter().find(|n| n.container.id == container_id)
    }

    fn node_by_container_mut(
        &mut self,
        container_id: &str,
    ) -> Result<&mut FakeNode> {
        self.nodes
            .iter_mut()
            .find(|n| n.container.id == container_id)
            .ok_or_else(|| rejected(&format!("No such container: {container_id}")))
    }

    fn reachable(
        &self,
        node_id: u64,
    ) -> bool {
        self.nodes.iter().any(|n| n.id == node_id && n.reachable())
    }

    fn has_quorum(&self) -> bool {
        let up = self.nodes.iter().filter(|n| n.reachable()).count();
        up * 2 > self.nodes.len()
    }

    /// Drops the leader if its node is gone.
    fn check_leader(&mut self) {
        if let Some(node) = self.leader.and_then(|r| self.node_of_replica(r)) {
            if !self.reachable(node) {
                self.leader = None;
                self.deposed = Some(node);
                self.polls_without_leader = 0;
            }
        }
    }

    fn elect(&mut self) {
        if !self.has_quorum() {
            return;
        }
        let candidate = self
            .replicas
            .iter()
            .filter(|r| Some(r.node_id) != self.deposed && self.reachable(r.node_id))
            .map(|r| r.id)
            .next();
        if let Some(replica) = candidate {
            self.leader = Some(replica);
        }
    }

    fn commit(&mut self) -> Result<()> {
        if self.leader.is_none() {
            return Err(rejected("no leader for database"));
        }
        if !self.has_quorum() {
            return Err(rejected("timed out waiting for quorum"));
        }
        Ok(())
    }
}

fn single_column(
    column: &str,
    value: Option<String>,
) -> Table {
    let rows = value.map(|v| Row::new([(column, v)])).into_iter().collect();
    Table::new(vec![column.to_string()], rows)
}

#[async_trait]
impl ContainerRuntime for FakeCluster {
    async fn compose(
        &self,
        args: Vec<String>,
    ) -> Result<String> {
        self.state().actions.push(format!("compose {}", args.join(" ")));
        Ok(String::new())
    }

    async fn compose_up(&self) -> Result<()> {
        let mut state = self.state();
        for node in state.nodes.iter_mut() {
            node.running = true;
            node.connected = true;
        }
        state.actions.push("compose up -d".to_string());
        Ok(())
    }

    async fn compose_restart(
        &self,
        services: Vec<String>,
    ) -> Result<()> {
        self.state()
            .actions
            .push(format!("compose restart {}", services.join(" ")));
        Ok(())
    }

    async fn compose_exec(
        &self,
        service: &str,
        args: Vec<String>,
    ) -> Result<String> {
        self.state()
            .actions
            .push(format!("compose exec -T {} {}", service, args.join(" ")));
        Ok(String::new())
    }

    async fn list_containers(
        &self,
        _filters: Vec<String>,
    ) -> Result<Vec<Container>> {
        let state = self.state();
        let mut containers: Vec<Container> = state.nodes.iter().map(|n| n.container.clone()).collect();
        containers.push(Container::new(CONTROL_CONTAINER_ID, "cloud-node-1"));
        Ok(containers)
    }

    async fn inspect_container(
        &self,
        name_or_id: &str,
    ) -> Result<Value> {
        let state = self.state();
        let node = state
            .nodes
            .iter()
            .find(|n| n.container.id == name_or_id || n.container.name == name_or_id)
            .ok_or_else(|| rejected(&format!("No such object: {name_or_id}")))?;
        Ok(json!({
            "Id": node.container.id,
            "Name": format!("/{}", node.container.name),
            "State": { "Running": node.running },
        }))
    }

    async fn kill_container(
        &self,
        id: &str,
    ) -> Result<()> {
        let mut state = self.state();
        let node = state.node_by_container_mut(id)?;
        if !node.running {
            return Err(rejected(&format!("container {id} is not running")));
        }
        node.running = false;
        state.actions.push(format!("kill {id}"));
        state.check_leader();
        Ok(())
    }

    async fn start_container(
        &self,
        id: &str,
    ) -> Result<()> {
        let mut state = self.state();
        state.node_by_container_mut(id)?.running = true;
        state.actions.push(format!("start {id}"));
        Ok(())
    }

    async fn disconnect_container(
        &self,
        id: &str,
        network: &str,
    ) -> Result<()> {
        let mut state = self.state();
        state.node_by_container_mut(id)?.connected = false;
        state.actions.push(format!("network disconnect {network} {id}"));
        state.check_leader();
        Ok(())
    }

    async fn connect_container(
        &self,
        id: &str,
        network: &str,
    ) -> Result<()> {
        let mut state = self.state();
        state.node_by_container_mut(id)?.connected = true;
        state.actions.push(format!("network connect {network} {id}"));
        Ok(())
    }

    async fn generate_root_token(&self) -> Result<String> {
        Ok(FAKE_ROOT_TOKEN.to_string())
    }
}

#[async_trait]
impl ControlPlane for FakeCluster {
    async fn database_id(
        &self,
        identity: &DatabaseIdentity,
    ) -> Result<Option<u64>> {
        Ok((identity.as_str() == FAKE_IDENTITY).then_some(FAKE_DB_ID))
    }

    async fn replicas(
        &self,
        database_id: u64,
    ) -> Result<Vec<Replica>> {
        if database_id != FAKE_DB_ID {
            return Ok(vec![]);
        }
        Ok(self.state().replicas.clone())
    }

    async fn leader_replica(
        &self,
        database_id: u64,
    ) -> Result<Option<u64>> {
        let mut state = self.state();
        if state.control_failures > 0 {
            state.control_failures -= 1;
            return Err(rejected("control database is busy"));
        }
        if database_id != FAKE_DB_ID {
            return Ok(None);
        }

        if state.leader.is_none() {
            state.polls_without_leader += 1;
            if state.polls_without_leader > state.election_delay {
                state.elect();
            }
        }
        Ok(state.leader)
    }

    async fn replica_node(
        &self,
        replica_id: u64,
    ) -> Result<Option<u64>> {
        Ok(self.state().node_of_replica(replica_id))
    }

    async fn node_address(
        &self,
        node_id: u64,
    ) -> Result<Option<String>> {
        Ok(self
            .state()
            .nodes
            .iter()
            .find(|n| n.id == node_id)
            .map(|n| format!("{}:3000", n.hostname)))
    }

    async fn call(
        &self,
        reducer: &str,
        args: Vec<Value>,
    ) -> Result<()> {
        let mut state = self.state();
        match reducer {
            "prefer_leader" => {
                if !state.admins.contains(FAKE_OWNER) {
                    return Err(rejected(&format!("0x{FAKE_OWNER} is not an admin")));
                }
                let replica = args
                    .first()
                    .and_then(Value::as_u64)
                    .ok_or_else(|| rejected("prefer_leader expects a replica id"))?;
                let node = state
                    .node_of_replica(replica)
                    .ok_or_else(|| rejected(&format!("no replica {replica}")))?;
                if !state.reachable(node) {
                    return Err(rejected(&format!("node {node} is unreachable")));
                }
                state.leader = Some(replica);
                Ok(())
            }
            other => Err(rejected(&format!("no such reducer: {other}"))),
        }
    }

    async fn current_identity(&self) -> Result<String> {
        Ok(FAKE_OWNER.to_string())
    }

    async fn grant_admin(
        &self,
        root_token: &str,
        identity: &str,
    ) -> Result<()> {
        if root_token != FAKE_ROOT_TOKEN {
            return Err(rejected("invalid root token"));
        }
        self.state().admins.insert(identity.to_string());
        Ok(())
    }
}

#[async_trait]
impl DatabaseClient for FakeCluster {
    async fn call(
        &self,
        reducer: &str,
        args: Vec<Value>,
    ) -> Result<()> {
        let mut state = self.state();
        match reducer {
            "start" => {
                state.commit()?;
                let id = args
                    .first()
                    .and_then(Value::as_u64)
                    .ok_or_else(|| rejected("start expects an id"))?;
                state.rows.insert(id);
                Ok(())
            }
            "send_message" => {
                state.commit()?;
                state.messages += 1;
                Ok(())
            }
            other => Err(rejected(&format!("no such reducer: {other}"))),
        }
    }

    async fn sql(
        &self,
        query: &str,
    ) -> Result<Table> {
        let mut state = self.state();
        if state.read_misses > 0 {
            state.read_misses -= 1;
            return Ok(single_column("id", None));
        }

        let id = query
            .rsplit('=')
            .next()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .ok_or_else(|| rejected(&format!("unsupported query: {query}")))?;
        let found = state.rows.contains(&id).then(|| id.to_string());
        Ok(single_column("id", found))
    }
}

#[async_trait]
impl HealthCheck for FakeCluster {
    async fn ping(
        &self,
        host: &str,
    ) -> Result<()> {
        let state = self.state();
        if state.nodes.iter().any(|n| n.hostname == host && n.reachable()) {
            return Ok(());
        }
        Err(HealthError::Unhealthy {
            url: format!("http://{host}:3000/v1/ping"),
            status: 503,
        }
        .into())
    }
}
