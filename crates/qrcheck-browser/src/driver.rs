//! The capability seam between the verification core and a browser engine.
//!
//! The core only ever talks to a `dyn PageDriver`; [`crate::Page`] is the
//! chromiumoxide-backed implementation. Keeping the seam narrow lets the
//! core be exercised against a scripted fake without a browser.

use crate::download::DownloadWatch;
use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;

/// Primitive interactions against one live page.
///
/// Selectors are CSS selectors; operations that target a single element
/// act on the first match.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Loads `url` and waits for the document to finish loading.
    async fn goto(&self, url: &str) -> Result<()>;

    /// Clicks the first element matching `selector`.
    async fn click(&self, selector: &str) -> Result<()>;

    /// Replaces the value of the input matching `selector`.
    async fn fill(&self, selector: &str, value: &str) -> Result<()>;

    /// Non-blocking visibility probe; a missing element is simply not visible.
    async fn is_visible(&self, selector: &str) -> Result<bool>;

    /// Text content of the first match, or `None` when nothing matches.
    async fn text_content(&self, selector: &str) -> Result<Option<String>>;

    /// Number of elements matching `selector`.
    async fn count(&self, selector: &str) -> Result<usize>;

    /// PNG bytes of a screenshot clipped to the first match.
    async fn screenshot_element(&self, selector: &str) -> Result<Vec<u8>>;

    /// Evaluates a side-effect-free expression in page context.
    async fn evaluate_value(&self, script: &str) -> Result<Value>;

    /// Current document title.
    async fn title(&self) -> Result<String>;

    /// Enables downloads into `dir` and registers a completion listener.
    ///
    /// The returned watch must exist before the triggering click is sent.
    async fn expect_download(&self, dir: &Path) -> Result<DownloadWatch>;

    /// Number of console errors captured so far on this page.
    fn console_error_count(&self) -> usize {
        0
    }

    /// Closes the page. The driver must not be used afterwards.
    async fn close_page(&self) -> Result<()> {
        Ok(())
    }
}
