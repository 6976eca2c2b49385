use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::debug;
use tracing::warn;

use crate::Error;
use crate::Result;
use crate::RetrySpec;

/// Bounded retry with a fixed delay between attempts.
///
/// Meant for operations that race cluster reconfiguration, e.g. a write sent
/// while an election may be in flight. Exhaustion is reported as a value,
/// not an error, so the caller can keep probing and assert on final state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: usize,
    delay: Duration,
}

/// Result of running an operation under a [`RetryPolicy`].
#[derive(Debug)]
pub enum RetryOutcome<T> {
    /// An attempt succeeded.
    Ok(T),
    /// Every attempt hit a transient error; the cluster may still get there.
    StillPending { attempts: usize, last_error: Error },
    /// An attempt hit an error retrying cannot fix.
    Failed { attempts: usize, error: Error },
}

impl RetryPolicy {
    /// `max_retries` below 1 is treated as a single attempt.
    pub fn new(
        max_retries: usize,
        delay: Duration,
    ) -> Self {
        Self {
            max_retries: max_retries.max(1),
            delay,
        }
    }

    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub async fn run<F, Fut, T>(
        &self,
        mut task: F,
    ) -> RetryOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let error = match task().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "attempt succeeded after retry");
                    }
                    return RetryOutcome::Ok(value);
                }
                Err(e) => e,
            };

            if !error.is_transient() {
                warn!(attempt, max = self.max_retries, "attempt failed permanently: {}", error);
                return RetryOutcome::Failed {
                    attempts: attempt,
                    error,
                };
            }

            if attempt >= self.max_retries {
                warn!(attempt, max = self.max_retries, "attempt failed: {}", error);
                warn!("Max retries ({}) reached. Giving up.", self.max_retries);
                return RetryOutcome::StillPending {
                    attempts: attempt,
                    last_error: error,
                };
            }

            warn!(
                attempt,
                max = self.max_retries,
                "attempt failed: {}. Retrying in {:?}",
                error,
                self.delay
            );
            sleep(self.delay).await;
        }
    }
}

impl From<&RetrySpec> for RetryPolicy {
    fn from(spec: &RetrySpec) -> Self {
        RetryPolicy::new(spec.max_retries, spec.delay())
    }
}

impl From<RetrySpec> for RetryPolicy {
    fn from(spec: RetrySpec) -> Self {
        RetryPolicy::from(&spec)
    }
}

impl<T> RetryOutcome<T> {
    pub fn succeeded(&self) -> bool {
        matches!(self, RetryOutcome::Ok(_))
    }

    /// Exhausted on transient errors only
    pub fn is_pending(&self) -> bool {
        matches!(self, RetryOutcome::StillPending { .. })
    }

    /// Attempts made; `None` on success since the count is not tracked there.
    pub fn attempts(&self) -> Option<usize> {
        match self {
            RetryOutcome::Ok(_) => None,
            RetryOutcome::StillPending { attempts, .. } | RetryOutcome::Failed { attempts, .. } => {
                Some(*attempts)
            }
        }
    }

    pub fn ok(self) -> Option<T> {
        match self {
            RetryOutcome::Ok(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_result(self) -> Result<T> {
        match self {
            RetryOutcome::Ok(v) => Ok(v),
            RetryOutcome::StillPending { last_error, .. } => Err(last_error),
            RetryOutcome::Failed { error, .. } => Err(error),
        }
    }
}
