//! Failures of the browser driving layer.
//!
//! Waits report the condition they were waiting on, element failures
//! report the selector, and downloads report what the browser said about
//! them. Callers map these onto their own scenario-level taxonomy.

use std::time::Duration;
use thiserror::Error;

/// Result alias for browser operations.
pub type Result<T> = std::result::Result<T, BrowserError>;

/// Everything that can go wrong while driving a page.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// Chrome could not be started (missing binary, bad flags, sandbox).
    #[error("failed to launch browser: {reason}")]
    LaunchFailed {
        /// What the launcher was doing when it failed.
        reason: String,
        /// Launcher error, when there is one.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The DevTools session refused a request (new tab, shutdown).
    #[error("CDP connection failed: {0}")]
    ConnectionFailed(String),

    /// The document at `url` never finished loading.
    #[error("navigation to '{url}' failed: {reason}")]
    NavigationFailed {
        /// Requested URL.
        url: String,
        /// Underlying cause.
        reason: String,
    },

    /// A polled condition did not hold within its bound.
    #[error("wait condition '{condition}' timed out after {timeout:?}")]
    WaitTimeout {
        /// Human-readable name of the condition.
        condition: String,
        /// Bound that expired.
        timeout: Duration,
    },

    /// No element matched a selector, or interacting with it failed.
    #[error("element '{selector}' unavailable: {reason}")]
    ElementNotFound {
        /// CSS selector that was queried.
        selector: String,
        /// What went wrong.
        reason: String,
    },

    /// A page-context script threw or returned something unexpected.
    #[error("JavaScript execution failed: {0}")]
    ScriptExecutionFailed(String),

    /// The browser cancelled a download or stopped reporting on it.
    #[error("download failed: {0}")]
    DownloadFailed(String),

    /// The browser was already shut down.
    #[error("browser instance is already closed")]
    AlreadyClosed,

    /// Protocol-level error from chromiumoxide.
    #[error("chromiumoxide error: {0}")]
    ChromiumOxide(#[from] chromiumoxide::error::CdpError),

    /// Filesystem error, usually around the download directory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BrowserError {
    /// True when a wait expired, as opposed to the page misbehaving.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, BrowserError::WaitTimeout { .. })
    }
}
