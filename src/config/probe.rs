use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Write-then-read probe used to verify that a leader commits writes
///
/// The defaults target the counter module published by the replication
/// scenarios: `start(id, count)` schedules inserts into `counter`, and
/// `send_message(text)` appends to `message`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProbeConfig {
    /// Reducer called as `<write_reducer>(id, 1)`
    #[serde(default = "default_write_reducer")]
    pub write_reducer: String,

    /// Table the probe row lands in
    #[serde(default = "default_table")]
    pub table: String,

    /// Primary key column of `table`
    #[serde(default = "default_id_column")]
    pub id_column: String,

    /// Reducer called as `<message_reducer>(text)` when probing for quorum loss
    #[serde(default = "default_message_reducer")]
    pub message_reducer: String,

    /// Pause before a health probe to let replication settle (unit: milliseconds)
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            write_reducer: default_write_reducer(),
            table: default_table(),
            id_column: default_id_column(),
            message_reducer: default_message_reducer(),
            settle_delay_ms: default_settle_delay_ms(),
        }
    }
}

impl ProbeConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("write_reducer", &self.write_reducer),
            ("table", &self.table),
            ("id_column", &self.id_column),
            ("message_reducer", &self.message_reducer),
        ] {
            if value.trim().is_empty() {
                return Err(Error::Config(ConfigError::Message(format!(
                    "probe.{name} cannot be empty"
                ))));
            }
        }
        Ok(())
    }

    /// `None` when no settle delay is configured
    pub fn settle_delay(&self) -> Option<Duration> {
        (self.settle_delay_ms > 0).then(|| Duration::from_millis(self.settle_delay_ms))
    }
}

fn default_write_reducer() -> String {
    "start".to_string()
}
fn default_table() -> String {
    "counter".to_string()
}
fn default_id_column() -> String {
    "id".to_string()
}
fn default_message_reducer() -> String {
    "send_message".to_string()
}
fn default_settle_delay_ms() -> u64 {
    2000
}
