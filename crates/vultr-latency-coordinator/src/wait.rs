//! Fixed-interval waiting with cancellation support.
//!
//! Used for instance readiness polling (wall-clock capped) and for the
//! shell-ready check (attempt capped).

use backon::{BackoffBuilder, ConstantBuilder};
use std::future::Future;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Configuration for fixed-interval waiting.
#[derive(Debug, Clone)]
pub struct WaitConfig {
    /// Delay between checks
    pub interval: Duration,
    /// Maximum total time to wait
    pub timeout: Duration,
    /// Maximum number of checks, if bounded by attempts rather than time alone
    pub max_attempts: Option<u32>,
}

impl WaitConfig {
    /// Poll every `interval` until `timeout` elapses
    pub fn polling(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            timeout,
            max_attempts: None,
        }
    }

    /// Try `attempts` times, `delay` apart, with no wall-clock cap
    pub fn attempts(attempts: u32, delay: Duration) -> Self {
        Self {
            interval: delay,
            timeout: Duration::MAX,
            max_attempts: Some(attempts.max(1)),
        }
    }
}

#[derive(Debug, Error)]
pub enum WaitError {
    #[error("Timeout waiting for {resource} after {timeout:?} ({attempts} attempts)")]
    Timeout {
        resource: String,
        timeout: Duration,
        attempts: u32,
    },

    #[error("{resource} not ready after {attempts} attempts")]
    Exhausted { resource: String, attempts: u32 },

    #[error("Wait for {resource} cancelled")]
    Cancelled { resource: String },

    #[error("Check for {resource} failed: {source}")]
    Check {
        resource: String,
        #[source]
        source: anyhow::Error,
    },
}

impl WaitError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, WaitError::Cancelled { .. })
    }
}

/// Wait for a condition to become true, checking at a fixed interval.
///
/// `check` returns `Ok(true)` when ready, `Ok(false)` to retry. An `Err`
/// aborts the wait.
pub async fn wait_for_resource<F, Fut>(
    config: &WaitConfig,
    cancel: Option<&CancellationToken>,
    mut check: F,
    resource_name: &str,
) -> Result<(), WaitError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<bool>>,
{
    let start = Instant::now();
    let mut attempts = 0u32;

    // The first check is immediate; each further attempt consumes one delay
    let retries = config
        .max_attempts
        .map_or(usize::MAX, |max| max.saturating_sub(1) as usize);
    let mut delays = ConstantBuilder::default()
        .with_delay(config.interval)
        .with_max_times(retries)
        .build();

    let cancelled = || WaitError::Cancelled {
        resource: resource_name.to_string(),
    };

    loop {
        attempts += 1;

        if cancel.is_some_and(|token| token.is_cancelled()) {
            return Err(cancelled());
        }

        match check().await {
            Ok(true) => {
                debug!(resource = %resource_name, attempts, "Resource ready");
                return Ok(());
            }
            Ok(false) => {}
            Err(source) => {
                warn!(resource = %resource_name, error = ?source, "Resource check failed");
                return Err(WaitError::Check {
                    resource: resource_name.to_string(),
                    source,
                });
            }
        }

        let Some(delay) = delays.next() else {
            return Err(WaitError::Exhausted {
                resource: resource_name.to_string(),
                attempts,
            });
        };

        let elapsed = start.elapsed();
        if elapsed >= config.timeout {
            return Err(WaitError::Timeout {
                resource: resource_name.to_string(),
                timeout: config.timeout,
                attempts,
            });
        }
        // Never sleep past the wall-clock cap
        let delay = delay.min(config.timeout - elapsed);

        debug!(
            resource = %resource_name,
            attempt = attempts,
            delay_ms = delay.as_millis(),
            "Resource not ready, retrying"
        );

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = async {
                match cancel {
                    Some(token) => token.cancelled().await,
                    None => std::future::pending::<()>().await,
                }
            } => {
                return Err(cancelled());
            }
        }
    }
}
