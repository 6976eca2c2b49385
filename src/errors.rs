//! Harness Error Hierarchy
//!
//! Separates failures of the tools the harness drives (container runtime,
//! database CLI, health endpoint) from conditions observed in the cluster
//! itself (no leader yet, missing rows), since the latter are expected while
//! an election is in flight.

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failures of the external tools the harness drives
    #[error(transparent)]
    System(#[from] SystemError),

    /// Harness configuration loading failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Facts about the cluster that could not be established
    #[error(transparent)]
    Cluster(#[from] ClusterError),

    /// Unrecoverable failures requiring the scenario to abort
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    /// Container runtime or database CLI invocation failures
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Health endpoint failures
    #[error(transparent)]
    Health(#[from] HealthError),

    /// Malformed JSON returned by a tool or passed as reducer arguments
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Program could not be started at all
    #[error("Failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Program ran and reported failure
    #[error("`{command}` exited with {code:?}: {stderr}")]
    NonZeroExit {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// Output did not have the expected shape
    #[error("Unexpected output from `{command}`: {reason}")]
    UnexpectedOutput { command: String, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum HealthError {
    /// Endpoint could not be reached
    #[error("Ping to {url} failed: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Endpoint answered with something other than 200
    #[error("Ping to {url} returned status {status}")]
    Unhealthy { url: String, status: u16 },
}

#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    /// Control database query results that could not be interpreted
    #[error(transparent)]
    ControlPlane(#[from] ControlPlaneError),

    /// Leader resolution failures
    #[error(transparent)]
    Leader(#[from] LeaderError),

    /// Write-then-read health probe failures
    #[error(transparent)]
    Probe(#[from] ProbeError),

    /// Failure or recovery action name not recognised
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// Database identity is not a hex string
    #[error("Invalid database identity: {0}")]
    InvalidIdentity(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ControlPlaneError {
    /// Column absent from the query output
    #[error("Column `{column}` missing from result")]
    MissingColumn { column: String },

    /// Cell expected to hold an integer holds none
    #[error("Column `{column}` holds no integer: {value:?}")]
    InvalidInteger { column: String, value: String },

    /// Network address cell in an unknown format
    #[error("Unrecognised network address: {0}")]
    InvalidNetworkAddress(String),
}

#[derive(Debug, thiserror::Error)]
pub enum LeaderError {
    /// Database identity not registered with the control plane
    #[error("Database 0x{identity} not found in control database")]
    UnknownDatabase { identity: String },

    /// A step of leader resolution returned no rows
    #[error("No current leader (no {stage} found)")]
    NoLeader { stage: &'static str },

    /// Leader resolved but no container could be matched to it
    #[error("Could not find leader container for host {hostname:?}")]
    ContainerNotFound { hostname: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// Row written through the leader could not be read back
    #[error("Could not find {id} in {table} table")]
    RowMissing { id: u64, table: String },
}

impl Error {
    /// Whether retrying the same operation later may succeed.
    ///
    /// Non-zero exits are treated as transient: while an election is in
    /// flight the database CLI rejects writes and the control database may
    /// briefly refuse queries.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::System(SystemError::Command(CommandError::NonZeroExit { .. })) => true,
            Error::System(SystemError::Health(_)) => true,
            Error::Cluster(ClusterError::Leader(LeaderError::NoLeader { .. })) => true,
            Error::Cluster(ClusterError::Leader(LeaderError::ContainerNotFound { .. })) => true,
            Error::Cluster(ClusterError::Probe(_)) => true,
            _ => false,
        }
    }

    /// Whether this error only reports that no leader is currently known.
    pub fn is_no_leader(&self) -> bool {
        matches!(
            self,
            Error::Cluster(ClusterError::Leader(LeaderError::NoLeader { .. }))
        )
    }
}

// ============== Conversion Implementations ============== //
impl From<CommandError> for Error {
    fn from(e: CommandError) -> Self {
        Error::System(SystemError::Command(e))
    }
}

impl From<HealthError> for Error {
    fn from(e: HealthError) -> Self {
        Error::System(SystemError::Health(e))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::System(SystemError::Serialization(e))
    }
}

impl From<ControlPlaneError> for Error {
    fn from(e: ControlPlaneError) -> Self {
        Error::Cluster(ClusterError::ControlPlane(e))
    }
}

impl From<LeaderError> for Error {
    fn from(e: LeaderError) -> Self {
        Error::Cluster(ClusterError::Leader(e))
    }
}

impl From<ProbeError> for Error {
    fn from(e: ProbeError) -> Self {
        Error::Cluster(ClusterError::Probe(e))
    }
}
