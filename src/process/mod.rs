//! External program execution.
//!
//! Every tool the harness drives (container runtime, database CLI) is run
//! through [`CommandRunner`], so argument construction and output parsing
//! can be unit tested against a mock.

use std::fmt;
use std::process::Stdio;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tokio::process::Command;
use tracing::debug;
use tracing::trace;

use crate::CommandError;
use crate::Result;


/// A program with its arguments and extra environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub envs: Vec<(String, String)>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    pub fn arg(
        mut self,
        arg: impl Into<String>,
    ) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(
        mut self,
        args: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }
}

impl fmt::Display for Invocation {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " {arg:?}")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync + 'static {
    /// Runs the invocation to completion and returns its stdout.
    ///
    /// A non-zero exit is an error carrying the captured stderr.
    async fn run(
        &self,
        invocation: Invocation,
    ) -> Result<String>;
}

/// Runs invocations as child processes
#[derive(Debug, Default, Clone)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(
        &self,
        invocation: Invocation,
    ) -> Result<String> {
        let command_line = invocation.to_string();
        debug!("$ {}", command_line);

        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .envs(invocation.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| CommandError::Spawn {
                program: invocation.program.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !stderr.is_empty() {
            debug!("--- stderr ---\n{}", stderr);
        }
        if !stdout.trim().is_empty() {
            trace!("--- stdout ---\n{}", stdout.trim());
        }

        if !output.status.success() {
            return Err(CommandError::NonZeroExit {
                command: command_line,
                code: output.status.code(),
                stderr,
            }
            .into());
        }

        Ok(stdout)
    }
}
