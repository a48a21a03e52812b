//! # qrcheck-browser
//!
//! Browser driving layer for the qrcheck suite, built on chromiumoxide.
//!
//! This crate launches headless Chrome, exposes pages with the element
//! level primitives a page object needs (click, fill, visibility probes,
//! element screenshots, download tracking) and the polling waits that
//! bound every suspension with a timeout.
//!
//! ## Architecture
//!
//! - **TestBrowser**: Manages the browser process lifecycle
//! - **Page**: A browser tab; implements [`PageDriver`]
//! - **PageDriver**: The capability trait the verification core consumes
//! - **DownloadWatch**: A download listener registered ahead of its trigger
//! - **ConsoleCapture**: Per-page console messages for diagnostics
//! - **AppHost**: The externally configured application base URL
//! - **WaitConfig**: Timeout and poll interval for one wait
//!
//! ## Example Usage
//!
//! ```ignore
//! use qrcheck_browser::{PageDriver, TestBrowser, TestBrowserConfig};
//!
//! let browser = TestBrowser::launch(TestBrowserConfig::default()).await?;
//! let page = browser.new_page().await?;
//! page.goto("https://www.qrcode-monkey.com").await?;
//! assert!(page.is_visible("#qrcodeUrl").await?);
//! browser.close().await?;
//! ```
//!
//! ## Testing Strategy
//!
//! Unit tests cover script generation, waits and download signalling.
//! Tests that need a real browser are `#[ignore]`; run them with
//! `cargo test -p qrcheck-browser -- --ignored`.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod browser;
pub mod console;
pub mod download;
pub mod driver;
pub mod error;
pub mod host;
pub mod page;
pub mod wait;

pub use browser::{TestBrowser, TestBrowserConfig};
pub use console::{ConsoleCapture, ConsoleLevel, ConsoleMessage};
pub use download::{DownloadSignal, DownloadWatch};
pub use driver::PageDriver;
pub use error::{BrowserError, Result};
pub use host::{AppHost, StaticHost, join_url};
pub use page::Page;
pub use wait::{
    DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT, WaitConfig, wait_for_result, wait_for_value,
};
