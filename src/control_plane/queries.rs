//! Control database queries and the records they decode into.

use serde::Serialize;

use super::FromRow;
use super::Row;
use crate::utils::net::host_of;
use crate::ControlPlaneError;
use crate::DatabaseIdentity;
use crate::Result;

pub(crate) fn database_id_sql(identity: &DatabaseIdentity) -> String {
    format!("select id from database where database_identity=0x{identity}")
}

pub(crate) fn replicas_sql(database_id: u64) -> String {
    format!("select id, node_id from replica where database_id={database_id}")
}

pub(crate) fn leader_sql(database_id: u64) -> String {
    format!("select leader from replication_state where database_id={database_id}")
}

pub(crate) fn replica_node_sql(replica_id: u64) -> String {
    format!("select node_id from replica where id={replica_id}")
}

pub(crate) fn node_address_sql(node_id: u64) -> String {
    format!("select network_addr from node where id={node_id}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseIdRow {
    pub id: u64,
}

impl FromRow for DatabaseIdRow {
    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self { id: row.int("id")? })
    }
}

/// Placement of one copy of a database on a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Replica {
    pub id: u64,
    pub node_id: u64,
}

impl FromRow for Replica {
    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: row.int("id")?,
            node_id: row.int("node_id")?,
        })
    }
}

/// Replica currently leading a database
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaderRow {
    pub leader: u64,
}

impl FromRow for LeaderRow {
    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            leader: row.int("leader")?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplicaNodeRow {
    pub node_id: u64,
}

impl FromRow for ReplicaNodeRow {
    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            node_id: row.int("node_id")?,
        })
    }
}

/// Advertised `host:port` of a node, absent while the node has none
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeAddressRow {
    pub network_addr: Option<String>,
}

impl NodeAddressRow {
    pub fn hostname(&self) -> Option<&str> {
        self.network_addr.as_deref().map(host_of)
    }
}

impl FromRow for NodeAddressRow {
    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            network_addr: parse_network_addr(row.text("network_addr")?)?,
        })
    }
}

/// `(some = "worker-2:3000")` -> `Some("worker-2:3000")`, `(none = ())` -> `None`
pub(crate) fn parse_network_addr(cell: &str) -> Result<Option<String>> {
    let cell = cell.trim();
    let inner = cell
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .map(str::trim)
        .ok_or_else(|| ControlPlaneError::InvalidNetworkAddress(cell.to_string()))?;

    if inner.starts_with("none") {
        return Ok(None);
    }

    let quoted = inner
        .strip_prefix("some")
        .map(|s| s.trim_start())
        .and_then(|s| s.strip_prefix('='))
        .map(str::trim)
        .and_then(|s| s.strip_prefix('"'))
        .and_then(|s| s.strip_suffix('"'))
        .ok_or_else(|| ControlPlaneError::InvalidNetworkAddress(cell.to_string()))?;

    if quoted.is_empty() {
        return Ok(None);
    }
    Ok(Some(quoted.to_string()))
}
