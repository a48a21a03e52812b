//! Chrome process lifecycle.
//!
//! `TestBrowser` launches Chrome, keeps the CDP handler polled and hands
//! out pages. One scenario owns one page at a time; the browser itself is
//! shared by the sequential scenarios of a suite run.
//!
//! Dropping a `TestBrowser` without `close()` still kills Chrome (through
//! chromiumoxide's own Drop), but skips the graceful shutdown. Either way
//! the profile directory is removed once Chrome is gone.

use crate::error::{BrowserError, Result};
use crate::page::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// How Chrome is started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestBrowserConfig {
    /// No window (default). The `visible` crate feature overrides this.
    pub headless: bool,
    /// Viewport in CSS pixels; element screenshots are taken at this size.
    pub window_size: (u32, u32),
    /// Extra command-line flags, appended after the built-in ones.
    pub args: Vec<String>,
    /// Chrome binary; auto-detected when `None`.
    pub chrome_path: Option<String>,
}

impl Default for TestBrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_size: (1280, 1024),
            // Containers rarely offer user namespaces or a large /dev/shm.
            args: vec![
                "--no-sandbox".to_string(),
                "--disable-dev-shm-usage".to_string(),
            ],
            chrome_path: None,
        }
    }
}

impl TestBrowserConfig {
    /// Headless defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shows the browser window.
    #[must_use]
    pub fn visible(mut self) -> Self {
        self.headless = false;
        self
    }

    /// Sets the viewport.
    #[must_use]
    pub fn with_window_size(mut self, width: u32, height: u32) -> Self {
        self.window_size = (width, height);
        self
    }

    /// Uses a specific Chrome executable.
    #[must_use]
    pub fn with_chrome_path(mut self, path: impl Into<String>) -> Self {
        self.chrome_path = Some(path.into());
        self
    }

    fn runs_headless(&self) -> bool {
        self.headless && !cfg!(feature = "visible")
    }

    /// Flags passed to Chrome besides the profile directory.
    #[must_use]
    pub fn launch_args(&self) -> Vec<String> {
        let (width, height) = self.window_size;
        let mut args = Vec::with_capacity(self.args.len() + 2);
        if self.runs_headless() {
            args.push("--headless".to_string());
        }
        args.push(format!("--window-size={width},{height}"));
        args.extend(self.args.iter().cloned());
        args
    }

    #[allow(clippy::result_large_err)]
    fn to_browser_config(&self, profile: PathBuf) -> Result<BrowserConfig> {
        let (width, height) = self.window_size;
        let mut builder = BrowserConfig::builder()
            .window_size(width, height)
            .user_data_dir(profile)
            .args(self.launch_args());

        if !self.runs_headless() {
            builder = builder.with_head();
        }
        if let Some(path) = &self.chrome_path {
            builder = builder.chrome_executable(path);
        }

        builder.build().map_err(|e| BrowserError::LaunchFailed {
            reason: format!("invalid browser configuration: {e}"),
            source: None,
        })
    }
}

/// A running Chrome instance.
///
/// ```ignore
/// let browser = TestBrowser::launch(TestBrowserConfig::default()).await?;
/// let page = browser.new_page().await?;
/// page.navigate("https://www.qrcode-monkey.com").await?;
/// browser.close().await?;
/// ```
pub struct TestBrowser {
    // Declared before `profile`: Chrome must be gone before its profile
    // directory is removed.
    browser: Mutex<Option<Browser>>,
    handler: JoinHandle<()>,
    profile: TempDir,
}

/// A new, empty Chrome profile directory under the system temp dir.
fn fresh_profile() -> Result<TempDir> {
    Ok(tempfile::Builder::new().prefix("qrcheck-profile-").tempdir()?)
}

impl TestBrowser {
    /// Starts Chrome with a fresh profile.
    ///
    /// The profile lives in a new directory under the system temp dir, so
    /// no cookies survive between launches and the consent banner depends
    /// only on the site. The directory is deleted with the `TestBrowser`.
    ///
    /// # Errors
    ///
    /// `LaunchFailed` when Chrome is missing or refuses to start, `Io` when
    /// the profile directory cannot be created.
    pub async fn launch(config: TestBrowserConfig) -> Result<Self> {
        let profile = fresh_profile()?;
        debug!(?config, profile = %profile.path().display(), "launching browser");

        let (browser, mut events) =
            Browser::launch(config.to_browser_config(profile.path().to_path_buf())?)
            .await
            .map_err(|e| BrowserError::LaunchFailed {
                reason: "Chrome did not start".to_string(),
                source: Some(Box::new(e)),
            })?;

        // CDP responses are only delivered while the handler stream is polled.
        let handler = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if let Err(e) = event {
                    warn!(error = %e, "browser handler error");
                }
            }
        });

        Ok(Self {
            browser: Mutex::new(Some(browser)),
            handler,
            profile,
        })
    }

    /// Profile directory of this Chrome instance.
    #[must_use]
    pub fn profile_dir(&self) -> &Path {
        self.profile.path()
    }

    /// Opens a blank tab with its own console capture.
    ///
    /// # Errors
    ///
    /// `AlreadyClosed` after `close()`, `ConnectionFailed` when Chrome
    /// refuses the new target.
    pub async fn new_page(&self) -> Result<Page> {
        let slot = self.browser.lock().await;
        let browser = slot.as_ref().ok_or(BrowserError::AlreadyClosed)?;

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::ConnectionFailed(e.to_string()))?;
        debug!("page opened");
        Ok(Page::new(page))
    }

    /// Shuts Chrome down and stops the handler.
    ///
    /// # Errors
    ///
    /// `ConnectionFailed` when Chrome does not acknowledge the shutdown.
    pub async fn close(self) -> Result<()> {
        let taken = self.browser.lock().await.take();
        if let Some(mut browser) = taken {
            debug!("closing browser");
            browser
                .close()
                .await
                .map_err(|e| BrowserError::ConnectionFailed(e.to_string()))?;
            match browser.wait().await {
                Ok(status) => debug!(?status, "browser exited"),
                Err(e) => warn!(error = %e, "browser exit status unavailable"),
            }
        }
        Ok(())
    }

    /// Whether `close()` already ran.
    pub async fn is_closed(&self) -> bool {
        self.browser.lock().await.is_none()
    }
}

impl Drop for TestBrowser {
    fn drop(&mut self) {
        self.handler.abort();
        if self.browser.get_mut().is_some() {
            warn!("TestBrowser dropped without close(); killing Chrome");
        }
    }
}
