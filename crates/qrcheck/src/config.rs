//! Run configuration.
//!
//! Sources, lowest to highest priority: built-in defaults, a TOML file
//! (`qrcheck.toml` or an explicit path), `QRCHECK_*` environment variables
//! (nested keys separated by `__`, e.g. `QRCHECK_BROWSER__HEADLESS=false`),
//! and finally CLI overrides applied by the binary.

use crate::error::ConfigError;
use crate::page_model::Locators;
use figment::{
    Figment,
    providers::{Env, Format as _, Serialized, Toml},
};
use qrcheck_browser::{TestBrowserConfig, WaitConfig};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "qrcheck.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,
    pub chrome_path: Option<String>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1280,
            window_height: 1024,
            chrome_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QrCheckConfig {
    /// Entry URL of the generator application.
    pub base_url: String,
    /// Payload submitted for encoding.
    pub target: String,
    /// Payload the client-side validation must reject.
    pub invalid_target: String,
    /// Substring the rejection message must contain.
    pub validation_text: String,
    /// Regex the homepage title must match.
    pub title_pattern: String,
    /// Bound for default-state checks.
    pub default_timeout_ms: u64,
    /// Bound for anything that waits on code generation.
    pub generation_timeout_ms: u64,
    pub poll_interval_ms: u64,
    /// Where downloads land; a fresh temporary directory when unset.
    pub download_dir: Option<PathBuf>,
    pub browser: BrowserSettings,
    pub locators: Locators,
}

impl Default for QrCheckConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.qrcode-monkey.com".to_string(),
            target: "https://qrstud.io/qrmnky".to_string(),
            invalid_target: "not-a-url".to_string(),
            validation_text: "There are errors you have to fix before generating".to_string(),
            title_pattern: "QR.*Code.*Monkey".to_string(),
            default_timeout_ms: 10_000,
            generation_timeout_ms: 60_000,
            poll_interval_ms: 100,
            download_dir: None,
            browser: BrowserSettings::default(),
            locators: Locators::default(),
        }
    }
}

impl QrCheckConfig {
    /// Layers defaults, the config file and the environment.
    ///
    /// An explicit `path` must exist; the default file is optional.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a source fails to parse or a value is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            if !path.is_file() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
        }
        Self::figment(path).extract::<Self>()?.validated()
    }

    /// The layered provider stack, exposed for callers that merge more on top.
    #[must_use]
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        figment = match path {
            Some(path) => figment.merge(Toml::file_exact(path)),
            None => figment.merge(Toml::file(DEFAULT_CONFIG_FILE)),
        };

        figment.merge(Env::prefixed("QRCHECK_").split("__"))
    }

    /// Rejects values no run could succeed with.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the offending field.
    pub fn validated(self) -> Result<Self, ConfigError> {
        let invalid = |field: &str, reason: &str| ConfigError::InvalidValue {
            field: field.to_string(),
            reason: reason.to_string(),
        };

        if self.base_url.trim().is_empty() {
            return Err(invalid("base_url", "must not be empty"));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(invalid("base_url", "must be an http(s) URL"));
        }
        if self.target.is_empty() {
            return Err(invalid("target", "must not be empty"));
        }
        if self.default_timeout_ms == 0 {
            return Err(invalid("default_timeout_ms", "must be greater than zero"));
        }
        if self.generation_timeout_ms == 0 {
            return Err(invalid("generation_timeout_ms", "must be greater than zero"));
        }
        if self.poll_interval_ms == 0 {
            return Err(invalid("poll_interval_ms", "must be greater than zero"));
        }
        if let Err(e) = Regex::new(&self.title_pattern) {
            return Err(invalid("title_pattern", &e.to_string()));
        }

        Ok(self)
    }

    /// Short bound: default-state and consent checks.
    #[must_use]
    pub fn default_wait(&self) -> WaitConfig {
        WaitConfig::from_millis(self.default_timeout_ms, self.poll_interval_ms)
    }

    /// Long bound: generation-dependent visibility and downloads.
    #[must_use]
    pub fn generation_wait(&self) -> WaitConfig {
        WaitConfig::from_millis(self.generation_timeout_ms, self.poll_interval_ms)
    }

    #[must_use]
    pub fn browser_config(&self) -> TestBrowserConfig {
        let mut config = TestBrowserConfig::new()
            .with_window_size(self.browser.window_width, self.browser.window_height);
        if !self.browser.headless {
            config = config.visible();
        }
        if let Some(path) = &self.browser.chrome_path {
            config = config.with_chrome_path(path.clone());
        }
        config
    }
}
