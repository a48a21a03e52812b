//! Scripted stand-ins for a live page, shared by the unit tests.

use crate::page_model::{Locators, PageModel};
use async_trait::async_trait;
use futures::StreamExt;
use futures::channel::mpsc::{UnboundedSender, unbounded};
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use qrcheck_browser::{
    BrowserError, DownloadSignal, DownloadWatch, PageDriver, Result, StaticHost,
};
use qrcode::{Color, QrCode};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// What a scripted click changes on the fake page.
#[derive(Debug, Clone)]
pub enum Effect {
    Show(String),
    Hide(String),
    ShowText(String, String),
}

struct ClickRule {
    selector: String,
    when_filled: Option<String>,
    effect: Effect,
}

#[derive(Default)]
struct State {
    visible: HashSet<String>,
    texts: HashMap<String, String>,
    counts: HashMap<String, usize>,
    failing: HashSet<String>,
    rules: Vec<ClickRule>,
    events: Vec<String>,
    clicks: Vec<String>,
    fills: Vec<(String, String)>,
    visited: Vec<String>,
    screenshots: Vec<String>,
    tab_attributes: Value,
    title: String,
    screenshot: Vec<u8>,
    download_payload: Option<Vec<u8>>,
    download_tx: Option<(UnboundedSender<DownloadSignal>, PathBuf)>,
    downloads: usize,
    console_errors: usize,
    closed: bool,
}

/// A `PageDriver` whose DOM is a handful of sets and maps.
///
/// Clones share state, so a test keeps one handle for scripting and
/// inspection while the model under test owns another.
#[derive(Clone, Default)]
pub struct FakeDriver {
    state: Arc<Mutex<State>>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn show(&self, selector: &str) {
        self.state().visible.insert(selector.to_string());
    }

    pub fn show_text(&self, selector: &str, text: &str) {
        let mut state = self.state();
        state.visible.insert(selector.to_string());
        state.texts.insert(selector.to_string(), text.to_string());
    }

    /// Visibility probes for `selector` return an error.
    pub fn fail_probes_for(&self, selector: &str) {
        self.state().failing.insert(selector.to_string());
    }

    pub fn set_count(&self, selector: &str, count: usize) {
        self.state().counts.insert(selector.to_string(), count);
    }

    /// Value returned by every script evaluation.
    pub fn set_tab_attributes(&self, value: Value) {
        self.state().tab_attributes = value;
    }

    pub fn set_title(&self, title: &str) {
        self.state().title = title.to_string();
    }

    pub fn set_screenshot(&self, bytes: Vec<u8>) {
        self.state().screenshot = bytes;
    }

    pub fn set_console_errors(&self, count: usize) {
        self.state().console_errors = count;
    }

    /// Clicking the download control writes `bytes` into the armed
    /// directory. Without an armed watch the download goes unseen.
    pub fn serve_download(&self, bytes: Vec<u8>) {
        self.state().download_payload = Some(bytes);
    }

    pub fn on_click(&self, selector: &str, effect: Effect) {
        self.state().rules.push(ClickRule {
            selector: selector.to_string(),
            when_filled: None,
            effect,
        });
    }

    /// Like [`FakeDriver::on_click`], but only while the last filled value is `value`.
    pub fn on_click_if_filled(&self, selector: &str, value: &str, effect: Effect) {
        self.state().rules.push(ClickRule {
            selector: selector.to_string(),
            when_filled: Some(value.to_string()),
            effect,
        });
    }

    pub fn events(&self) -> Vec<String> {
        self.state().events.clone()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.state().clicks.clone()
    }

    pub fn filled(&self) -> Vec<(String, String)> {
        self.state().fills.clone()
    }

    pub fn visited(&self) -> Vec<String> {
        self.state().visited.clone()
    }

    pub fn screenshots(&self) -> Vec<String> {
        self.state().screenshots.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }
}

fn apply(state: &mut State, effect: &Effect) {
    match effect {
        Effect::Show(selector) => {
            state.visible.insert(selector.clone());
        }
        Effect::Hide(selector) => {
            state.visible.remove(selector);
        }
        Effect::ShowText(selector, text) => {
            state.visible.insert(selector.clone());
            state.texts.insert(selector.clone(), text.clone());
        }
    }
}

fn deliver_download(state: &mut State) -> Result<()> {
    // Without a payload the watch stays armed, as a real browser's would.
    let Some(bytes) = state.download_payload.clone() else {
        return Ok(());
    };
    let Some((tx, dir)) = state.download_tx.take() else {
        return Ok(());
    };
    state.downloads += 1;
    let guid = format!("download-{}", state.downloads);
    std::fs::write(dir.join(&guid), bytes)?;
    let _ = tx.unbounded_send(DownloadSignal::Started {
        guid: guid.clone(),
        suggested_filename: "qr-code.png".to_string(),
    });
    let _ = tx.unbounded_send(DownloadSignal::Completed { guid });
    Ok(())
}

#[async_trait]
impl PageDriver for FakeDriver {
    async fn goto(&self, url: &str) -> Result<()> {
        let mut state = self.state();
        state.events.push(format!("goto:{url}"));
        state.visited.push(url.to_string());
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let mut state = self.state();
        state.events.push(format!("click:{selector}"));
        state.clicks.push(selector.to_string());

        let last_fill = state.fills.last().map(|(_, value)| value.clone());
        let effects: Vec<Effect> = state
            .rules
            .iter()
            .filter(|rule| rule.selector == selector)
            .filter(|rule| rule.when_filled.is_none() || rule.when_filled == last_fill)
            .map(|rule| rule.effect.clone())
            .collect();
        for effect in &effects {
            apply(&mut state, effect);
        }

        if selector == Locators::default().download_button {
            deliver_download(&mut state)?;
        }
        Ok(())
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        let mut state = self.state();
        state.events.push(format!("fill:{selector}"));
        state.fills.push((selector.to_string(), value.to_string()));
        Ok(())
    }

    async fn is_visible(&self, selector: &str) -> Result<bool> {
        let state = self.state();
        if state.failing.contains(selector) {
            return Err(BrowserError::ElementNotFound {
                selector: selector.to_string(),
                reason: "scripted probe failure".to_string(),
            });
        }
        Ok(state.visible.contains(selector))
    }

    async fn text_content(&self, selector: &str) -> Result<Option<String>> {
        Ok(self.state().texts.get(selector).cloned())
    }

    async fn count(&self, selector: &str) -> Result<usize> {
        let state = self.state();
        Ok(match state.counts.get(selector) {
            Some(count) => *count,
            None => usize::from(state.visible.contains(selector)),
        })
    }

    async fn screenshot_element(&self, selector: &str) -> Result<Vec<u8>> {
        let mut state = self.state();
        if !state.visible.contains(selector) {
            return Err(BrowserError::ElementNotFound {
                selector: selector.to_string(),
                reason: "not visible".to_string(),
            });
        }
        state.screenshots.push(selector.to_string());
        Ok(state.screenshot.clone())
    }

    async fn evaluate_value(&self, _script: &str) -> Result<Value> {
        Ok(self.state().tab_attributes.clone())
    }

    async fn title(&self) -> Result<String> {
        Ok(self.state().title.clone())
    }

    async fn expect_download(&self, dir: &Path) -> Result<DownloadWatch> {
        let (tx, rx) = unbounded();
        let mut state = self.state();
        state.events.push("arm-download".to_string());
        state.download_tx = Some((tx, dir.to_path_buf()));
        Ok(DownloadWatch::new(dir, rx.boxed()))
    }

    fn console_error_count(&self) -> usize {
        self.state().console_errors
    }

    async fn close_page(&self) -> Result<()> {
        let mut state = self.state();
        state.events.push("close".to_string());
        state.closed = true;
        Ok(())
    }
}

/// A model over `driver` pointed at a fixed fake host.
pub fn fake_model(driver: &FakeDriver) -> PageModel {
    PageModel::new(
        Arc::new(driver.clone()),
        Arc::new(StaticHost::new("https://generator.test")),
        Locators::default(),
    )
}

/// Renders `payload` as a black-on-white code, `scale` pixels per module,
/// surrounded by `quiet` light modules.
pub fn qr_image(payload: &str, scale: u32, quiet: u32) -> GrayImage {
    let code = QrCode::new(payload.as_bytes()).unwrap();
    let width = u32::try_from(code.width()).unwrap();
    let colors = code.to_colors();
    let side = (width + 2 * quiet) * scale;

    GrayImage::from_fn(side, side, |x, y| {
        let (mx, my) = (x / scale, y / scale);
        let inside = (quiet..quiet + width).contains(&mx) && (quiet..quiet + width).contains(&my);
        if inside {
            let index = ((my - quiet) * width + (mx - quiet)) as usize;
            if colors[index] == Color::Dark {
                return Luma([0]);
            }
        }
        Luma([255])
    })
}

/// PNG bytes of any image.
pub fn encode_png(image: DynamicImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

/// PNG bytes of a well-formed code for `payload`.
pub fn qr_png(payload: &str) -> Vec<u8> {
    encode_png(DynamicImage::ImageLuma8(qr_image(payload, 8, 4)))
}
