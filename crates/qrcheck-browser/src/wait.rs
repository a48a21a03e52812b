//! Bounded polling.
//!
//! Every suspension on page state goes through [`wait_for_value`]: a probe
//! is polled until it yields a value or the deadline passes. The deadline
//! is the only cancellation mechanism, and expiry always surfaces as
//! [`BrowserError::WaitTimeout`] naming the condition. Nothing here retries
//! a completed wait.

use crate::error::{BrowserError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, sleep_until};
use tracing::trace;

/// Bound used when a caller has no better one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Gap between two probes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Bound and cadence of one wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitConfig {
    /// Total time the condition may take.
    pub timeout: Duration,
    /// Time between probes.
    pub poll_interval: Duration,
}

impl WaitConfig {
    /// Explicit bound and cadence.
    #[must_use]
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }

    /// Explicit bound, default cadence.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new(timeout, DEFAULT_POLL_INTERVAL)
    }

    /// Millisecond values as they appear in configuration files.
    #[must_use]
    pub fn from_millis(timeout_ms: u64, poll_interval_ms: u64) -> Self {
        Self::new(
            Duration::from_millis(timeout_ms),
            Duration::from_millis(poll_interval_ms),
        )
    }

    fn expired(&self, description: &str) -> BrowserError {
        BrowserError::WaitTimeout {
            condition: description.to_string(),
            timeout: self.timeout,
        }
    }
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT, DEFAULT_POLL_INTERVAL)
    }
}

/// Polls `probe` until it yields `Some(value)`.
///
/// The probe always runs at least once. Probe errors count as "not yet"
/// (the element may still be detached) and are only logged at trace.
///
/// # Errors
///
/// `WaitTimeout` naming `description` once the deadline passes.
pub async fn wait_for_value<T, F, Fut>(probe: F, config: WaitConfig, description: &str) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let deadline = Instant::now() + config.timeout;

    loop {
        match probe().await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {}
            Err(e) => trace!(condition = description, error = %e, "transient probe error"),
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(config.expired(description));
        }
        sleep_until((now + config.poll_interval).min(deadline)).await;
    }
}

/// Polls a fallible boolean condition until it holds.
///
/// # Errors
///
/// `WaitTimeout` naming `description` once the deadline passes.
pub async fn wait_for_result<F, Fut>(condition: F, config: WaitConfig, description: &str) -> Result<()>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    wait_for_value(
        || {
            let pending = condition();
            async move { pending.await.map(|holds| holds.then_some(())) }
        },
        config,
        description,
    )
    .await
}
