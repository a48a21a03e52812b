//! Page object for the QR generator.
//!
//! [`Locators`] is the DOM contract the suite depends on; [`PageModel`]
//! is the set of interactions available against the live application.
//! Triggers never wait for their effects: observation is always a
//! separate call, so each acquisition channel can wait on its own
//! condition.

use crate::error::{Result, ScenarioError};
use qrcheck_browser::{
    AppHost, BrowserError, PageDriver, WaitConfig, wait_for_result, wait_for_value,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Stable element references of the generator UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Locators {
    pub consent_button: String,
    pub url_input: String,
    pub create_button: String,
    pub download_button: String,
    pub logo_section: String,
    pub first_logo: String,
    /// Rendered code; only present once the backend generated an image.
    pub generated_image: String,
    /// Placeholder shown before anything was submitted.
    pub default_image: String,
    pub error_message: String,
    /// Navigation anchors carrying a `setTab('<id>')` action attribute.
    pub tab_anchor: String,
    pub tab_action_attribute: String,
    pub settings_region: String,
}

impl Default for Locators {
    fn default() -> Self {
        Self {
            consent_button: "#onetrust-accept-btn-handler".to_string(),
            url_input: "#qrcodeUrl".to_string(),
            create_button: "#button-create-qr-code".to_string(),
            download_button: "#button-download-qr-code-png".to_string(),
            logo_section: r#"div[ng-class*="editView==='logo'"]"#.to_string(),
            first_logo: ".shape-options .shape.ng-scope".to_string(),
            generated_image: r#"img[src*="api.qrcode-monkey.com/tmp/"]"#.to_string(),
            default_image: r#"img[src="/img/default-preview-qr.svg"]"#.to_string(),
            error_message: ".alert-danger".to_string(),
            tab_anchor: "a.tab".to_string(),
            tab_action_attribute: "ng-click".to_string(),
            settings_region: ".settings".to_string(),
        }
    }
}

/// What a creation action produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreationOutcome {
    /// The generated image became visible.
    Generated,
    /// The inline validation message became visible, with its text.
    Rejected(String),
}

/// Interactions against one live page of the generator.
#[derive(Clone)]
pub struct PageModel {
    driver: Arc<dyn PageDriver>,
    host: Arc<dyn AppHost>,
    locators: Locators,
}

impl std::fmt::Debug for PageModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageModel")
            .field("base_url", &self.host.base_url())
            .field("locators", &self.locators)
            .finish_non_exhaustive()
    }
}

impl PageModel {
    pub fn new(driver: Arc<dyn PageDriver>, host: Arc<dyn AppHost>, locators: Locators) -> Self {
        Self {
            driver,
            host,
            locators,
        }
    }

    #[must_use]
    pub fn locators(&self) -> &Locators {
        &self.locators
    }

    #[must_use]
    pub fn driver(&self) -> &dyn PageDriver {
        self.driver.as_ref()
    }

    /// Loads the entry surface, resetting all UI state.
    pub async fn navigate(&self) -> Result<()> {
        let url = self.host.url("/");
        info!(%url, "opening generator");
        self.driver.goto(&url).await?;
        Ok(())
    }

    /// Clicks the consent control only if it is visible right now.
    ///
    /// Returns whether a click happened. Absence is a valid initial
    /// condition and never an error; only a failing click on a visible
    /// control is.
    pub async fn dismiss_consent_if_present(&self) -> Result<bool> {
        let selector = &self.locators.consent_button;
        let visible = self.driver.is_visible(selector).await.unwrap_or(false);
        if !visible {
            debug!("no consent banner");
            return Ok(false);
        }
        self.driver.click(selector).await?;
        debug!("consent banner dismissed");
        Ok(true)
    }

    /// Fills the payload and presses create. Does not wait for the result.
    pub async fn submit_creation(&self, target: &str) -> Result<()> {
        debug!(%target, "submitting creation");
        self.driver.fill(&self.locators.url_input, target).await?;
        self.click_create().await
    }

    /// Presses create without touching the input.
    pub async fn click_create(&self) -> Result<()> {
        self.driver.click(&self.locators.create_button).await?;
        Ok(())
    }

    /// Activates the download control. Callers must register a download
    /// watch before calling this.
    pub async fn trigger_download(&self) -> Result<()> {
        self.driver.click(&self.locators.download_button).await?;
        Ok(())
    }

    /// PNG bytes of the generated-code element only, without page chrome.
    pub async fn capture_region(&self) -> Result<Vec<u8>> {
        Ok(self
            .driver
            .screenshot_element(&self.locators.generated_image)
            .await?)
    }

    pub async fn open_logo_section(&self) -> Result<()> {
        self.driver.click(&self.locators.logo_section).await?;
        Ok(())
    }

    pub async fn select_first_logo(&self) -> Result<()> {
        self.driver.click(&self.locators.first_logo).await?;
        Ok(())
    }

    pub async fn is_generated_visible(&self) -> Result<bool> {
        Ok(self.driver.is_visible(&self.locators.generated_image).await?)
    }

    pub async fn wait_for_generated_visible(&self, config: WaitConfig) -> Result<()> {
        self.wait_visible(&self.locators.generated_image, config, "generated QR code visible")
            .await
    }

    pub async fn wait_for_default_visible(&self, config: WaitConfig) -> Result<()> {
        self.wait_visible(&self.locators.default_image, config, "default QR placeholder visible")
            .await
    }

    /// Waits until the placeholder is gone, as it is after a creation.
    pub async fn wait_for_default_hidden(&self, config: WaitConfig) -> Result<()> {
        let driver = self.driver.as_ref();
        let selector = self.locators.default_image.as_str();
        wait_for_result(
            || async move { Ok::<_, BrowserError>(!driver.is_visible(selector).await?) },
            config,
            "default QR placeholder hidden",
        )
        .await?;
        Ok(())
    }

    async fn wait_visible(&self, selector: &str, config: WaitConfig, condition: &str) -> Result<()> {
        let driver = self.driver.as_ref();
        wait_for_result(|| driver.is_visible(selector), config, condition).await?;
        Ok(())
    }

    /// The inline error text, or `None` when no message is shown.
    pub async fn read_validation_message(&self) -> Result<Option<String>> {
        let selector = &self.locators.error_message;
        if !self.driver.is_visible(selector).await? {
            return Ok(None);
        }
        Ok(self.driver.text_content(selector).await?)
    }

    /// Waits until exactly one creation outcome is observable.
    ///
    /// Both the generated image and the validation message being visible
    /// at once is a `ValidationMismatch`; neither within `config.timeout`
    /// is a `Timeout`.
    pub async fn observe_outcome(&self, config: WaitConfig) -> Result<CreationOutcome> {
        let driver = self.driver.as_ref();
        let generated = self.locators.generated_image.as_str();
        let error = self.locators.error_message.as_str();

        let (generated_visible, error_visible) = wait_for_value(
            || async move {
                let g = driver.is_visible(generated).await?;
                let e = driver.is_visible(error).await?;
                Ok::<_, BrowserError>((g || e).then_some((g, e)))
            },
            config,
            "generated QR code or validation message visible",
        )
        .await?;

        match (generated_visible, error_visible) {
            (true, true) => Err(ScenarioError::ValidationMismatch(
                "generated code and validation message are visible together".to_string(),
            )),
            (true, false) => Ok(CreationOutcome::Generated),
            _ => {
                let text = driver.text_content(error).await?.unwrap_or_default();
                Ok(CreationOutcome::Rejected(text))
            }
        }
    }

    pub async fn title(&self) -> Result<String> {
        Ok(self.driver.title().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeDriver, fake_model};
    use std::time::Duration;

    fn quick() -> WaitConfig {
        WaitConfig::new(Duration::from_millis(60), Duration::from_millis(5))
    }

    #[tokio::test]
    async fn consent_is_clicked_only_when_visible() {
        let driver = FakeDriver::new();
        driver.show("#onetrust-accept-btn-handler");
        let model = fake_model(&driver);

        assert!(model.dismiss_consent_if_present().await.unwrap());
        assert_eq!(driver.clicks(), vec!["#onetrust-accept-btn-handler"]);
    }

    #[tokio::test]
    async fn absent_consent_is_a_no_op() {
        let driver = FakeDriver::new();
        let model = fake_model(&driver);

        assert!(!model.dismiss_consent_if_present().await.unwrap());
        assert!(driver.clicks().is_empty());
    }

    #[tokio::test]
    async fn failing_probe_counts_as_absent_consent() {
        let driver = FakeDriver::new();
        driver.fail_probes_for("#onetrust-accept-btn-handler");
        let model = fake_model(&driver);

        assert!(!model.dismiss_consent_if_present().await.unwrap());
    }

    #[tokio::test]
    async fn navigate_opens_the_entry_surface() {
        let driver = FakeDriver::new();
        let model = fake_model(&driver);

        model.navigate().await.unwrap();
        assert_eq!(driver.visited(), vec!["https://generator.test/"]);
    }

    #[tokio::test]
    async fn submit_fills_then_clicks_create_without_waiting() {
        let driver = FakeDriver::new();
        let model = fake_model(&driver);

        model.submit_creation("https://qrstud.io/qrmnky").await.unwrap();

        assert_eq!(
            driver.filled(),
            vec![("#qrcodeUrl".to_string(), "https://qrstud.io/qrmnky".to_string())]
        );
        assert_eq!(driver.clicks(), vec!["#button-create-qr-code"]);
    }

    #[tokio::test]
    async fn validation_message_is_absent_until_shown() {
        let driver = FakeDriver::new();
        let model = fake_model(&driver);
        assert_eq!(model.read_validation_message().await.unwrap(), None);

        driver.show_text(".alert-danger", "There are errors you have to fix before generating");
        assert_eq!(
            model.read_validation_message().await.unwrap().as_deref(),
            Some("There are errors you have to fix before generating")
        );
    }

    #[tokio::test]
    async fn outcome_generated() {
        let driver = FakeDriver::new();
        driver.show(&Locators::default().generated_image);
        let model = fake_model(&driver);

        assert_eq!(
            model.observe_outcome(quick()).await.unwrap(),
            CreationOutcome::Generated
        );
    }

    #[tokio::test]
    async fn outcome_rejected_carries_text() {
        let driver = FakeDriver::new();
        driver.show_text(".alert-danger", "There are errors");
        let model = fake_model(&driver);

        assert_eq!(
            model.observe_outcome(quick()).await.unwrap(),
            CreationOutcome::Rejected("There are errors".to_string())
        );
    }

    #[tokio::test]
    async fn both_outcomes_at_once_violate_exclusion() {
        let driver = FakeDriver::new();
        driver.show(&Locators::default().generated_image);
        driver.show_text(".alert-danger", "There are errors");
        let model = fake_model(&driver);

        assert!(matches!(
            model.observe_outcome(quick()).await,
            Err(ScenarioError::ValidationMismatch(_))
        ));
    }

    #[tokio::test]
    async fn no_outcome_times_out() {
        let driver = FakeDriver::new();
        let model = fake_model(&driver);

        assert!(matches!(
            model.observe_outcome(quick()).await,
            Err(ScenarioError::Timeout { .. })
        ));
    }

    #[tokio::test]
    async fn generated_wait_reports_its_condition() {
        let driver = FakeDriver::new();
        let model = fake_model(&driver);

        match model.wait_for_generated_visible(quick()).await {
            Err(ScenarioError::Timeout { condition, .. }) => {
                assert_eq!(condition, "generated QR code visible");
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }
}
