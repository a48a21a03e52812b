//! # qrcheck
//!
//! End-to-end verification that a web QR code generator encodes exactly
//! the payload it was given.
//!
//! A run drives a real browser through [`qrcheck_browser`], creates a code,
//! retrieves it through one or both acquisition channels (file download
//! and element capture), decodes it and compares the payload byte for byte
//! with the submitted target.
//!
//! ## Layout
//!
//! - [`page_model`]: the DOM contract and the interactions on it
//! - [`tabs`]: runtime discovery of the settings tabs
//! - [`artifact`]: download and capture channels
//! - [`verify`]: decoding and exact comparison
//! - [`scenario`]: the run state machine and the suite
//!
//! ```rust,no_run
//! use qrcheck::config::QrCheckConfig;
//! use qrcheck::scenario::{Scenario, ScenarioSuite};
//! use qrcheck_browser::TestBrowser;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = QrCheckConfig::load(None)?;
//! let browser = TestBrowser::launch(config.browser_config()).await?;
//! let suite = ScenarioSuite::new(config)?;
//!
//! let report = suite.run(&browser, &[Scenario::DualChannel]).await;
//! assert!(report.passed());
//! browser.close().await?;
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod artifact;
pub mod cli;
pub mod config;
pub mod error;
pub mod logger;
pub mod page_model;
pub mod scenario;
pub mod tabs;
pub mod verify;

#[cfg(test)]
mod testing;

pub use artifact::{Acquisition, Artifact, CaptureChannel, Channel, DownloadChannel, DownloadedFile};
pub use config::QrCheckConfig;
pub use error::{ConfigError, Result, ScenarioError};
pub use page_model::{CreationOutcome, Locators, PageModel};
pub use scenario::{
    PageSource, RunState, Scenario, ScenarioReport, ScenarioRun, ScenarioSuite, SuiteReport,
};
pub use tabs::{TabDescriptor, TabDiscovery, check_unique, extract_tab_id, tab_selector};
pub use verify::{DecodedSymbol, QrDecoder, SymbolDecoder, Target, VerificationPipeline};
