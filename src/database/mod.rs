//! The database under test: identity, writes through reducers and reads
//! through SQL.


use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde_json::Value;
use tracing::debug;

use crate::ClusterError;
use crate::Error;
use crate::Result;
use crate::SpacetimeCli;
use crate::Table;

/// Hex identity of a published database, stored lower-case without `0x`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DatabaseIdentity(String);

impl DatabaseIdentity {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let hex = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ClusterError::InvalidIdentity(raw.to_string()).into());
        }

        Ok(Self(hex.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatabaseIdentity {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DatabaseIdentity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait DatabaseClient: Send + Sync + 'static {
    /// Calls a reducer with JSON-encoded arguments.
    async fn call(
        &self,
        reducer: &str,
        args: Vec<Value>,
    ) -> Result<()>;

    async fn sql(
        &self,
        query: &str,
    ) -> Result<Table>;
}

/// [`DatabaseClient`] for one database, backed by the database CLI
pub struct SpacetimeDatabase {
    cli: SpacetimeCli,
    identity: DatabaseIdentity,
}

impl SpacetimeDatabase {
    pub fn new(
        cli: SpacetimeCli,
        identity: DatabaseIdentity,
    ) -> Self {
        Self { cli, identity }
    }

    pub fn identity(&self) -> &DatabaseIdentity {
        &self.identity
    }
}

#[async_trait]
impl DatabaseClient for SpacetimeDatabase {
    async fn call(
        &self,
        reducer: &str,
        args: Vec<Value>,
    ) -> Result<()> {
        debug!("call {}({:?})", reducer, args);
        self.cli.call(self.identity.as_str(), reducer, &args).await?;
        Ok(())
    }

    async fn sql(
        &self,
        query: &str,
    ) -> Result<Table> {
        self.cli.sql(self.identity.as_str(), query).await
    }
}
