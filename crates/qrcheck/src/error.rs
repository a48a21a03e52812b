//! Failure taxonomy for verification runs.
//!
//! Every failure is fatal to the scenario that raised it and names the
//! condition that triggered it. Nothing in this crate recovers from or
//! retries a `ScenarioError`; repeating a scenario is the caller's policy.

use crate::artifact::Channel;
use crate::scenario::RunState;
use qrcheck_browser::BrowserError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result alias for scenario-level operations.
pub type Result<T> = std::result::Result<T, ScenarioError>;

#[derive(Debug, Error)]
pub enum ScenarioError {
    /// A visibility or materialization wait expired.
    #[error("timed out after {timeout:?} waiting for {condition}")]
    Timeout { condition: String, timeout: Duration },

    /// The decoder found no symbol in the artifact.
    #[error("no QR symbol could be decoded from the {channel} artifact")]
    DecodeFailure { channel: Channel },

    /// The decoded payload differs from what was submitted.
    #[error("{channel} artifact decoded to {actual:?}, expected {expected:?}")]
    Mismatch {
        channel: Channel,
        expected: String,
        actual: String,
    },

    /// Invalid input was not rejected the way the UI promises.
    #[error("validation mismatch: {0}")]
    ValidationMismatch(String),

    /// Tab discovery returned duplicates or nothing at all.
    #[error("tab discovery anomaly: {0}")]
    DiscoveryAnomaly(String),

    /// An observable UI predicate did not hold.
    #[error("assertion failed: {0}")]
    Assertion(String),

    /// The run state machine refused an action.
    #[error("cannot {action} while {from}")]
    InvalidTransition { from: RunState, action: &'static str },

    /// Any other browser failure (launch, navigation, element lookup...).
    #[error(transparent)]
    Browser(BrowserError),

    /// The artifact bytes are not a readable image container.
    #[error("artifact is not a readable image: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<BrowserError> for ScenarioError {
    fn from(err: BrowserError) -> Self {
        match err {
            BrowserError::WaitTimeout { condition, timeout } => {
                ScenarioError::Timeout { condition, timeout }
            }
            other => ScenarioError::Browser(other),
        }
    }
}

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("failed to load configuration: {0}")]
    Load(#[from] figment::Error),
}
