//! End-to-end scenarios and the suite that runs them.
//!
//! Every scenario gets a fresh page and its own [`ScenarioRun`], a small
//! state machine that refuses out-of-order interactions:
//!
//! ```text
//! Unconsented --settle--> Idle --create(valid)--> Created
//!                              \--create(invalid)--> Rejected
//! ```
//!
//! Customization (the logo) is only possible while `Idle`. `Created` and
//! `Rejected` are terminal. Nothing is retried: a scenario either passes
//! on its single attempt or reports the condition that failed.

use crate::artifact::{Acquisition, CaptureChannel, DownloadChannel};
use crate::config::QrCheckConfig;
use crate::error::{Result, ScenarioError};
use crate::page_model::{CreationOutcome, PageModel};
use crate::tabs::{TabDiscovery, check_unique};
use crate::verify::{Target, VerificationPipeline};
use async_trait::async_trait;
use qrcheck_browser::{AppHost, PageDriver, StaticHost, TestBrowser, WaitConfig};
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Where one run stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Unconsented,
    Idle,
    Created,
    Rejected,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Unconsented => "unconsented",
            RunState::Idle => "idle",
            RunState::Created => "created",
            RunState::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

/// One single-shot pass over a page.
#[derive(Debug)]
pub struct ScenarioRun {
    page: PageModel,
    state: RunState,
}

impl ScenarioRun {
    #[must_use]
    pub fn new(page: PageModel) -> Self {
        Self {
            page,
            state: RunState::Unconsented,
        }
    }

    #[must_use]
    pub fn state(&self) -> RunState {
        self.state
    }

    #[must_use]
    pub fn page(&self) -> &PageModel {
        &self.page
    }

    fn require(&self, expected: RunState, action: &'static str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ScenarioError::InvalidTransition {
                from: self.state,
                action,
            })
        }
    }

    /// Loads the entry surface and clears the consent banner if shown.
    pub async fn settle(&mut self) -> Result<()> {
        self.require(RunState::Unconsented, "settle")?;
        self.page.navigate().await?;
        let dismissed = self.page.dismiss_consent_if_present().await?;
        debug!(dismissed, "page settled");
        self.state = RunState::Idle;
        Ok(())
    }

    /// Picks the first logo option. Only meaningful before creation.
    pub async fn select_logo(&mut self) -> Result<()> {
        self.require(RunState::Idle, "select a logo")?;
        self.page.open_logo_section().await?;
        self.page.select_first_logo().await?;
        Ok(())
    }

    /// Submits `target` and waits for exactly one outcome.
    pub async fn create(&mut self, target: &Target, wait: WaitConfig) -> Result<CreationOutcome> {
        self.require(RunState::Idle, "create")?;
        self.page.submit_creation(target.as_str()).await?;
        let outcome = self.page.observe_outcome(wait).await?;
        self.state = match outcome {
            CreationOutcome::Generated => RunState::Created,
            CreationOutcome::Rejected(_) => RunState::Rejected,
        };
        debug!(state = %self.state, "creation observed");
        Ok(outcome)
    }
}

/// The end-to-end cases the suite knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    /// Placeholder before creation, generated code after, never both.
    DefaultState,
    /// Download channel decodes to the target.
    Download,
    /// Capture channel decodes to the target.
    Capture,
    /// Both channels on one creation decode to the target.
    DualChannel,
    /// A logo picked before creation leaves the payload intact.
    Logo,
    /// A malformed target is rejected with the validation message.
    InvalidInput,
    /// The homepage title matches the configured pattern.
    Title,
    /// Every discovered tab opens the settings region.
    Tabs,
}

impl Scenario {
    #[must_use]
    pub fn all() -> &'static [Scenario] {
        &[
            Scenario::DefaultState,
            Scenario::Download,
            Scenario::Capture,
            Scenario::DualChannel,
            Scenario::Logo,
            Scenario::InvalidInput,
            Scenario::Title,
            Scenario::Tabs,
        ]
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Scenario::DefaultState => "default-state",
            Scenario::Download => "download",
            Scenario::Capture => "capture",
            Scenario::DualChannel => "dual-channel",
            Scenario::Logo => "logo",
            Scenario::InvalidInput => "invalid-input",
            Scenario::Title => "title",
            Scenario::Tabs => "tabs",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Hands out a fresh page per scenario.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn open_page(&self) -> Result<Arc<dyn PageDriver>>;
}

#[async_trait]
impl PageSource for TestBrowser {
    async fn open_page(&self) -> Result<Arc<dyn PageDriver>> {
        let page = self.new_page().await?;
        Ok(Arc::new(page))
    }
}

/// Outcome of one scenario.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub scenario: Scenario,
    pub passed: bool,
    pub failure: Option<String>,
    pub elapsed_ms: u64,
    pub console_errors: usize,
}

/// Outcome of a whole suite run, in execution order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SuiteReport {
    pub scenarios: Vec<ScenarioReport>,
}

impl SuiteReport {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.scenarios.iter().all(|s| s.passed)
    }

    #[must_use]
    pub fn failures(&self) -> Vec<&ScenarioReport> {
        self.scenarios.iter().filter(|s| !s.passed).collect()
    }
}

enum DownloadDir {
    Temp(TempDir),
    Fixed(PathBuf),
}

impl DownloadDir {
    fn path(&self) -> &Path {
        match self {
            DownloadDir::Temp(dir) => dir.path(),
            DownloadDir::Fixed(path) => path,
        }
    }
}

/// Composes page interactions, acquisition and verification into scenarios.
pub struct ScenarioSuite {
    config: QrCheckConfig,
    host: Arc<dyn AppHost>,
    pipeline: VerificationPipeline,
    downloads: DownloadDir,
}

impl fmt::Debug for ScenarioSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScenarioSuite")
            .field("base_url", &self.host.base_url())
            .field("download_dir", &self.downloads.path())
            .finish_non_exhaustive()
    }
}

impl ScenarioSuite {
    /// Prepares the download directory: the configured one, or a fresh
    /// temporary directory removed with the suite.
    ///
    /// # Errors
    ///
    /// Returns `Io` when the directory cannot be created.
    pub fn new(config: QrCheckConfig) -> Result<Self> {
        let downloads = match &config.download_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                DownloadDir::Fixed(dir.clone())
            }
            None => DownloadDir::Temp(tempfile::Builder::new().prefix("qrcheck-").tempdir()?),
        };
        let host: Arc<dyn AppHost> = Arc::new(StaticHost::new(config.base_url.clone()));

        Ok(Self {
            config,
            host,
            pipeline: VerificationPipeline::default(),
            downloads,
        })
    }

    #[must_use]
    pub fn with_host(mut self, host: Arc<dyn AppHost>) -> Self {
        self.host = host;
        self
    }

    #[must_use]
    pub fn with_pipeline(mut self, pipeline: VerificationPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    #[must_use]
    pub fn download_dir(&self) -> &Path {
        self.downloads.path()
    }

    #[must_use]
    pub fn config(&self) -> &QrCheckConfig {
        &self.config
    }

    fn model(&self, driver: Arc<dyn PageDriver>) -> PageModel {
        PageModel::new(driver, Arc::clone(&self.host), self.config.locators.clone())
    }

    fn target(&self) -> Target {
        Target::new(self.config.target.clone())
    }

    /// Runs `scenarios` in order, each on its own page, and reports every
    /// outcome. A failing scenario never stops the ones after it.
    pub async fn run(&self, source: &dyn PageSource, scenarios: &[Scenario]) -> SuiteReport {
        let mut report = SuiteReport::default();

        for &scenario in scenarios {
            info!(%scenario, "scenario started");
            let start = Instant::now();
            let mut console_errors = 0;

            let result = match source.open_page().await {
                Ok(driver) => {
                    let result = self.run_scenario(scenario, self.model(Arc::clone(&driver))).await;
                    console_errors = driver.console_error_count();
                    if let Err(e) = driver.close_page().await {
                        warn!(%scenario, error = %e, "failed to close page");
                    }
                    result
                }
                Err(e) => Err(e),
            };

            let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
            match &result {
                Ok(()) => info!(%scenario, elapsed_ms, "scenario passed"),
                Err(e) => warn!(%scenario, elapsed_ms, error = %e, "scenario failed"),
            }

            report.scenarios.push(ScenarioReport {
                scenario,
                passed: result.is_ok(),
                failure: result.err().map(|e| e.to_string()),
                elapsed_ms,
                console_errors,
            });
        }

        report
    }

    /// Runs one scenario against an already opened page.
    pub async fn run_scenario(&self, scenario: Scenario, page: PageModel) -> Result<()> {
        let mut run = ScenarioRun::new(page);
        run.settle().await?;

        match scenario {
            Scenario::DefaultState => self.default_state(&mut run).await,
            Scenario::Download => {
                self.create_valid(&mut run).await?;
                self.acquire_and_verify(&run, &self.download_channel()).await
            }
            Scenario::Capture => {
                self.create_valid(&mut run).await?;
                self.acquire_and_verify(&run, &self.capture_channel()).await
            }
            Scenario::DualChannel => {
                self.create_valid(&mut run).await?;
                self.acquire_and_verify(&run, &self.download_channel()).await?;
                self.acquire_and_verify(&run, &self.capture_channel()).await
            }
            Scenario::Logo => {
                run.select_logo().await?;
                self.create_valid(&mut run).await?;
                self.acquire_and_verify(&run, &self.capture_channel()).await
            }
            Scenario::InvalidInput => self.invalid_input(&mut run).await,
            Scenario::Title => self.title(&run).await,
            Scenario::Tabs => {
                let discovery = TabDiscovery::new(run.page());
                let tabs = discovery.discover().await?;
                check_unique(&tabs)?;
                discovery.visit_all(&tabs, self.config.default_wait()).await
            }
        }
    }

    fn download_channel(&self) -> DownloadChannel {
        DownloadChannel::new(self.download_dir(), self.config.generation_wait())
    }

    fn capture_channel(&self) -> CaptureChannel {
        CaptureChannel::new(self.config.generation_wait())
    }

    async fn create_valid(&self, run: &mut ScenarioRun) -> Result<()> {
        match run.create(&self.target(), self.config.generation_wait()).await? {
            CreationOutcome::Generated => Ok(()),
            CreationOutcome::Rejected(text) => Err(ScenarioError::ValidationMismatch(format!(
                "valid target {:?} was rejected: {text}",
                self.config.target
            ))),
        }
    }

    async fn acquire_and_verify(&self, run: &ScenarioRun, channel: &dyn Acquisition) -> Result<()> {
        let artifact = channel.acquire(run.page()).await?;
        self.pipeline.verify(artifact, &self.target()).await?;
        Ok(())
    }

    async fn default_state(&self, run: &mut ScenarioRun) -> Result<()> {
        let page = run.page().clone();
        page.wait_for_default_visible(self.config.default_wait()).await?;
        if page.is_generated_visible().await? {
            return Err(ScenarioError::Assertion(
                "generated code visible before any creation".to_string(),
            ));
        }

        self.create_valid(run).await?;
        page.wait_for_generated_visible(self.config.generation_wait()).await?;
        page.wait_for_default_hidden(self.config.default_wait()).await
    }

    async fn invalid_input(&self, run: &mut ScenarioRun) -> Result<()> {
        let target = Target::new(self.config.invalid_target.clone());
        let outcome = run.create(&target, self.config.generation_wait()).await?;

        let text = match outcome {
            CreationOutcome::Rejected(text) => text,
            CreationOutcome::Generated => {
                return Err(ScenarioError::ValidationMismatch(format!(
                    "invalid target {target:?} produced a generated code"
                )));
            }
        };
        if !text.contains(&self.config.validation_text) {
            return Err(ScenarioError::ValidationMismatch(format!(
                "validation message {text:?} lacks {:?}",
                self.config.validation_text
            )));
        }
        if run.page().is_generated_visible().await? {
            return Err(ScenarioError::ValidationMismatch(
                "generated code visible next to the validation message".to_string(),
            ));
        }
        Ok(())
    }

    async fn title(&self, run: &ScenarioRun) -> Result<()> {
        let pattern = Regex::new(&self.config.title_pattern).map_err(|e| {
            ScenarioError::Assertion(format!("title pattern does not compile: {e}"))
        })?;
        let title = run.page().title().await?;
        if pattern.is_match(&title) {
            Ok(())
        } else {
            Err(ScenarioError::Assertion(format!(
                "title {title:?} does not match /{}/",
                self.config.title_pattern
            )))
        }
    }
}
