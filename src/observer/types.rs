use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::ClusterError;
use crate::Error;

/// Where the current leader lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderInfo {
    pub node_id: u64,
    pub hostname: String,
    /// `None` when no project container could be matched to the node
    pub container_id: Option<String>,
}

/// How a leader is taken out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureAction {
    #[default]
    Kill,
    Disconnect,
}

/// How a failed leader is brought back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecoveryAction {
    #[default]
    Start,
    Connect,
}

impl FailureAction {
    /// Recovery undoing this failure
    pub fn inverse(self) -> RecoveryAction {
        match self {
            FailureAction::Kill => RecoveryAction::Start,
            FailureAction::Disconnect => RecoveryAction::Connect,
        }
    }
}

impl FromStr for FailureAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "kill" => Ok(FailureAction::Kill),
            "disconnect" => Ok(FailureAction::Disconnect),
            other => Err(ClusterError::UnknownAction(other.to_string()).into()),
        }
    }
}

impl FromStr for RecoveryAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(RecoveryAction::Start),
            "connect" => Ok(RecoveryAction::Connect),
            other => Err(ClusterError::UnknownAction(other.to_string()).into()),
        }
    }
}

impl fmt::Display for FailureAction {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            FailureAction::Kill => f.write_str("kill"),
            FailureAction::Disconnect => f.write_str("disconnect"),
        }
    }
}

impl fmt::Display for RecoveryAction {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            RecoveryAction::Start => f.write_str("start"),
            RecoveryAction::Connect => f.write_str("connect"),
        }
    }
}
