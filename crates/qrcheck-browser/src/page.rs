//! Page-level browser operations.
//!
//! [`Page`] wraps a chromiumoxide page, captures its console, and
//! implements [`PageDriver`] on top of CDP. DOM probes run as small
//! scripts; every selector or value spliced into a script is JSON-encoded
//! first so it is always a string literal.

use crate::console::{ConsoleCapture, ConsoleMessage};
use crate::download::{DownloadSignal, DownloadWatch};
use crate::driver::PageDriver;
use crate::error::{BrowserError, Result};
use crate::wait::{WaitConfig, wait_for_result};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::browser::{
    DownloadProgressState, EventDownloadProgress, EventDownloadWillBegin,
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::cdp::js_protocol::runtime::EventConsoleApiCalled;
use chromiumoxide::element::Element;
use chromiumoxide::page::Page as ChromePage;
use futures::StreamExt;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;

/// A browser tab with console capture and element-level helpers.
#[derive(Debug)]
pub struct Page {
    inner: Arc<ChromePage>,
    console: ConsoleCapture,
    console_task: JoinHandle<()>,
}

impl Page {
    pub(crate) fn new(page: ChromePage) -> Self {
        let console = ConsoleCapture::new();
        let sink = console.clone();
        let page = Arc::new(page);

        let listener = page.clone();
        let console_task = tokio::spawn(async move {
            if let Ok(mut events) = listener.event_listener::<EventConsoleApiCalled>().await {
                while let Some(event) = events.next().await {
                    sink.record(ConsoleMessage::from(event.as_ref()));
                }
            }
        });

        Self {
            inner: page,
            console,
            console_task,
        }
    }

    /// Console messages captured on this page.
    #[must_use]
    pub fn console(&self) -> &ConsoleCapture {
        &self.console
    }

    /// Navigates to an absolute URL and waits for `document.readyState`.
    ///
    /// # Errors
    ///
    /// Returns `NavigationFailed` if the page fails to load or times out.
    pub async fn navigate(&self, url: &str) -> Result<()> {
        debug!(%url, "navigating");
        self.inner
            .goto(url)
            .await
            .map_err(|e| BrowserError::NavigationFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        self.wait_for_load(WaitConfig::default()).await
    }

    /// Waits until `document.readyState` is `"complete"`.
    ///
    /// # Errors
    ///
    /// Returns `WaitTimeout` if the document never finishes loading.
    pub async fn wait_for_load(&self, config: WaitConfig) -> Result<()> {
        wait_for_result(
            || async move {
                let state: String = self.evaluate("document.readyState").await?;
                Ok::<_, BrowserError>(state == "complete")
            },
            config,
            "document ready",
        )
        .await
    }

    /// Executes JavaScript in the page context and deserializes the result.
    ///
    /// # Errors
    ///
    /// Returns an error if execution fails or the result has another shape.
    pub async fn evaluate<T>(&self, script: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.inner
            .evaluate(script)
            .await
            .map_err(|e| BrowserError::ScriptExecutionFailed(e.to_string()))?
            .into_value()
            .map_err(|e| BrowserError::ScriptExecutionFailed(e.to_string()))
    }

    /// Waits for a CSS selector to be attached to the DOM.
    ///
    /// # Errors
    ///
    /// Returns `WaitTimeout` if the selector never matches.
    pub async fn wait_for_selector(&self, selector: &str, config: WaitConfig) -> Result<()> {
        wait_for_result(
            || async move { Ok::<_, BrowserError>(PageDriver::count(self, selector).await? > 0) },
            config,
            &format!("selector '{selector}'"),
        )
        .await
    }

    async fn element(&self, selector: &str) -> Result<Element> {
        self.inner
            .find_element(selector)
            .await
            .map_err(|e| BrowserError::ElementNotFound {
                selector: selector.to_string(),
                reason: e.to_string(),
            })
    }

    /// Closes the page and stops console capture.
    ///
    /// # Errors
    ///
    /// Returns an error if closing the page fails.
    pub async fn close(self) -> Result<()> {
        self.close_page().await
    }
}

#[async_trait]
impl PageDriver for Page {
    async fn goto(&self, url: &str) -> Result<()> {
        self.navigate(url).await
    }

    async fn click(&self, selector: &str) -> Result<()> {
        debug!(%selector, "click");
        self.element(selector)
            .await?
            .click()
            .await
            .map_err(|e| BrowserError::ElementNotFound {
                selector: selector.to_string(),
                reason: format!("click failed: {e}"),
            })?;
        Ok(())
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        debug!(%selector, "fill");
        let function = fill_function(value)?;
        self.element(selector)
            .await?
            .call_js_fn(function, false)
            .await
            .map_err(|e| BrowserError::ScriptExecutionFailed(e.to_string()))?;
        Ok(())
    }

    async fn is_visible(&self, selector: &str) -> Result<bool> {
        self.evaluate(&visibility_script(selector)?).await
    }

    async fn text_content(&self, selector: &str) -> Result<Option<String>> {
        // Round-trip through JSON: a bare `null` result carries no value over CDP.
        let encoded: String = self.evaluate(&text_content_script(selector)?).await?;
        serde_json::from_str(&encoded).map_err(|e| BrowserError::ScriptExecutionFailed(e.to_string()))
    }

    async fn count(&self, selector: &str) -> Result<usize> {
        self.evaluate(&count_script(selector)?).await
    }

    async fn screenshot_element(&self, selector: &str) -> Result<Vec<u8>> {
        debug!(%selector, "element screenshot");
        let element = self.element(selector).await?;
        element.scroll_into_view().await?;
        element
            .screenshot(CaptureScreenshotFormat::Png)
            .await
            .map_err(|e| BrowserError::ScriptExecutionFailed(e.to_string()))
    }

    async fn evaluate_value(&self, script: &str) -> Result<Value> {
        self.evaluate(script).await
    }

    async fn title(&self) -> Result<String> {
        self.evaluate("document.title").await
    }

    async fn expect_download(&self, dir: &Path) -> Result<DownloadWatch> {
        let params = SetDownloadBehaviorParams::builder()
            .behavior(SetDownloadBehaviorBehavior::AllowAndName)
            .download_path(dir.to_string_lossy().into_owned())
            .events_enabled(true)
            .build()
            .map_err(BrowserError::DownloadFailed)?;
        self.inner.execute(params).await?;

        let started = self
            .inner
            .event_listener::<EventDownloadWillBegin>()
            .await?
            .map(|event| DownloadSignal::Started {
                guid: event.guid.clone(),
                suggested_filename: event.suggested_filename.clone(),
            });

        let finished = self
            .inner
            .event_listener::<EventDownloadProgress>()
            .await?
            .filter_map(|event| async move {
                match event.state {
                    DownloadProgressState::Completed => Some(DownloadSignal::Completed {
                        guid: event.guid.clone(),
                    }),
                    DownloadProgressState::Canceled => Some(DownloadSignal::Canceled {
                        guid: event.guid.clone(),
                    }),
                    _ => None,
                }
            });

        debug!(dir = %dir.display(), "download listener armed");
        Ok(DownloadWatch::new(
            dir,
            futures::stream::select(started, finished).boxed(),
        ))
    }

    async fn close_page(&self) -> Result<()> {
        self.console_task.abort();
        // chromiumoxide pages are handles; closing a clone closes the target.
        (*self.inner).clone().close().await?;
        Ok(())
    }

    fn console_error_count(&self) -> usize {
        self.console.error_count()
    }
}

fn js_string(raw: &str) -> Result<String> {
    serde_json::to_string(raw).map_err(|e| BrowserError::ScriptExecutionFailed(e.to_string()))
}

fn visibility_script(selector: &str) -> Result<String> {
    let sel = js_string(selector)?;
    Ok(format!(
        "(() => {{ const el = document.querySelector({sel}); if (!el) return false; \
         const style = window.getComputedStyle(el); \
         if (style.display === 'none' || style.visibility === 'hidden') return false; \
         const rect = el.getBoundingClientRect(); \
         return rect.width > 0 && rect.height > 0; }})()"
    ))
}

fn text_content_script(selector: &str) -> Result<String> {
    let sel = js_string(selector)?;
    Ok(format!(
        "(() => {{ const el = document.querySelector({sel}); return JSON.stringify(el ? el.textContent : null); }})()"
    ))
}

fn count_script(selector: &str) -> Result<String> {
    let sel = js_string(selector)?;
    Ok(format!("document.querySelectorAll({sel}).length"))
}

// Data-bound inputs only notice programmatic changes through events.
fn fill_function(value: &str) -> Result<String> {
    let value = js_string(value)?;
    Ok(format!(
        "function() {{ this.focus(); this.value = {value}; \
         this.dispatchEvent(new Event('input', {{ bubbles: true }})); \
         this.dispatchEvent(new Event('change', {{ bubbles: true }})); }}"
    ))
}
