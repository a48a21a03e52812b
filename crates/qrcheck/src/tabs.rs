//! Runtime discovery of the generator's settings tabs.
//!
//! The tab set is never configured: each pass reads the action attribute
//! of every navigation anchor inside the page and extracts the identifier
//! from its `setTab('<id>')` call. Extraction is a pure function over the
//! attribute text so it can be checked without a browser.

use crate::error::{Result, ScenarioError};
use crate::page_model::PageModel;
use qrcheck_browser::{BrowserError, WaitConfig};
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::{debug, info};

static SET_TAB: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"setTab\('(.*)'\)").expect("tab action pattern is a valid regex")
});

/// Identifier of a navigable settings region plus the selector that
/// re-selects its anchor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TabDescriptor {
    pub id: String,
    pub selector: String,
}

/// Extracts the tab identifier from an action attribute value.
///
/// Total: any input without a `setTab('...')` call yields `None`.
#[must_use]
pub fn extract_tab_id(attribute: &str) -> Option<String> {
    SET_TAB
        .captures(attribute)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Rebuilds a selector for the anchor whose action calls `setTab('<id>')`.
///
/// Matches on the call as a substring, so anchors whose attribute carries
/// other statements next to the call are still found; `visit_all` rejects
/// a selector that matches more than one anchor. The call is written as a
/// double-quoted CSS string, so only backslashes and double quotes need
/// escaping.
#[must_use]
pub fn tab_selector(attribute: &str, id: &str) -> String {
    let value = format!("setTab('{id}')");
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("a[{attribute}*=\"{escaped}\"]")
}

/// Fails on an empty pass or on identifiers that appear more than once.
pub fn check_unique(tabs: &[TabDescriptor]) -> Result<()> {
    if tabs.is_empty() {
        return Err(ScenarioError::DiscoveryAnomaly(
            "no navigation tabs discovered".to_string(),
        ));
    }

    let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
    for tab in tabs {
        *seen.entry(tab.id.as_str()).or_default() += 1;
    }
    let duplicates: Vec<String> = seen
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(id, n)| format!("'{id}' x{n}"))
        .collect();

    if duplicates.is_empty() {
        Ok(())
    } else {
        Err(ScenarioError::DiscoveryAnomaly(format!(
            "duplicate tab identifiers: {}",
            duplicates.join(", ")
        )))
    }
}

fn extraction_script(anchor: &str, attribute: &str) -> Result<String> {
    let encode = |raw: &str| {
        serde_json::to_string(raw)
            .map_err(|e| ScenarioError::Browser(BrowserError::ScriptExecutionFailed(e.to_string())))
    };
    Ok(format!(
        "Array.from(document.querySelectorAll({})).map((el) => el.getAttribute({}))",
        encode(anchor)?,
        encode(attribute)?
    ))
}

/// Reads the attribute list produced by the extraction script.
fn attribute_values(value: &Value) -> Vec<Option<String>> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Discovers and walks the navigation tabs of one page.
#[derive(Debug)]
pub struct TabDiscovery<'a> {
    page: &'a PageModel,
}

impl<'a> TabDiscovery<'a> {
    #[must_use]
    pub fn new(page: &'a PageModel) -> Self {
        Self { page }
    }

    /// One discovery pass, in document order.
    ///
    /// Anchors whose attribute is missing or does not match are skipped.
    /// Uniqueness is not enforced here; see [`check_unique`].
    pub async fn discover(&self) -> Result<Vec<TabDescriptor>> {
        let locators = self.page.locators();
        let script = extraction_script(&locators.tab_anchor, &locators.tab_action_attribute)?;
        let raw = self.page.driver().evaluate_value(&script).await?;

        let tabs: Vec<TabDescriptor> = attribute_values(&raw)
            .into_iter()
            .flatten()
            .filter_map(|attr| extract_tab_id(&attr))
            .map(|id| TabDescriptor {
                selector: tab_selector(&locators.tab_action_attribute, &id),
                id,
            })
            .collect();

        debug!(count = tabs.len(), "tabs discovered");
        Ok(tabs)
    }

    /// Activates every tab in turn and waits for the settings region.
    ///
    /// Each selector must resolve to exactly one anchor.
    pub async fn visit_all(&self, tabs: &[TabDescriptor], wait: WaitConfig) -> Result<()> {
        let driver = self.page.driver();
        let settings = self.page.locators().settings_region.as_str();

        for tab in tabs {
            let matches = driver.count(&tab.selector).await?;
            if matches != 1 {
                return Err(ScenarioError::DiscoveryAnomaly(format!(
                    "tab '{}' selector {} matched {matches} anchors",
                    tab.id, tab.selector
                )));
            }

            driver.click(&tab.selector).await?;
            qrcheck_browser::wait_for_result(
                || driver.is_visible(settings),
                wait,
                &format!("settings visible after tab '{}'", tab.id),
            )
            .await?;
            info!(tab = %tab.id, "tab visited");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeDriver, fake_model};
    use proptest::prelude::*;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn extracts_identifier_from_action() {
        assert_eq!(extract_tab_id("setTab('logo')").as_deref(), Some("logo"));
        assert_eq!(
            extract_tab_id("editView='x'; setTab('colors')").as_deref(),
            Some("colors")
        );
        assert_eq!(extract_tab_id("setTab('')").as_deref(), Some(""));
    }

    #[test]
    fn non_matching_attributes_are_absent() {
        assert_eq!(extract_tab_id(""), None);
        assert_eq!(extract_tab_id("toggle()"), None);
        assert_eq!(extract_tab_id("setTab(logo)"), None);
        assert_eq!(extract_tab_id(r#"setTab("logo")"#), None);
    }

    #[test]
    fn selector_matches_original_markup() {
        assert_eq!(
            tab_selector("ng-click", "logo"),
            r#"a[ng-click*="setTab('logo')"]"#
        );
        assert_eq!(
            tab_selector("ng-click", r#"a"b\c"#),
            r#"a[ng-click*="setTab('a\"b\\c')"]"#
        );
    }

    #[test]
    fn empty_and_duplicate_passes_are_anomalies() {
        assert!(matches!(
            check_unique(&[]),
            Err(ScenarioError::DiscoveryAnomaly(msg)) if msg.contains("no navigation tabs")
        ));

        let tab = |id: &str| TabDescriptor {
            id: id.to_string(),
            selector: tab_selector("ng-click", id),
        };
        assert!(check_unique(&[tab("colors"), tab("logo")]).is_ok());
        assert!(matches!(
            check_unique(&[tab("logo"), tab("colors"), tab("logo")]),
            Err(ScenarioError::DiscoveryAnomaly(msg)) if msg.contains("'logo' x2")
        ));
    }

    #[test]
    fn script_encodes_selector_and_attribute() {
        let script = extraction_script("a.tab", "ng-click").unwrap();
        assert_eq!(
            script,
            r#"Array.from(document.querySelectorAll("a.tab")).map((el) => el.getAttribute("ng-click"))"#
        );
    }

    #[tokio::test]
    async fn discover_skips_unmatched_anchors() {
        let driver = FakeDriver::new();
        driver.set_tab_attributes(json!([
            "setTab('colors')",
            null,
            "openHelp()",
            "setTab('logo')"
        ]));
        let model = fake_model(&driver);

        let ids: Vec<String> = TabDiscovery::new(&model)
            .discover()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec!["colors", "logo"]);
    }

    #[tokio::test]
    async fn compound_actions_keep_a_usable_selector() {
        let driver = FakeDriver::new();
        driver.set_tab_attributes(json!([
            "editView='x'; setTab('colors')",
            "setTab('a'); setTab('b')"
        ]));
        let model = fake_model(&driver);

        let tabs = TabDiscovery::new(&model).discover().await.unwrap();

        assert_eq!(tabs[0].id, "colors");
        assert_eq!(tabs[0].selector, r#"a[ng-click*="setTab('colors')"]"#);
        assert_eq!(tabs[1].id, "a'); setTab('b");
        assert!(tabs[1].selector.contains("setTab('a'); setTab('b')"));
    }

    #[tokio::test]
    async fn visiting_requires_a_single_anchor_and_settings() {
        let driver = FakeDriver::new();
        driver.show(".settings");
        let model = fake_model(&driver);
        let discovery = TabDiscovery::new(&model);
        let wait = WaitConfig::new(Duration::from_millis(50), Duration::from_millis(5));

        let logo = TabDescriptor {
            id: "logo".into(),
            selector: tab_selector("ng-click", "logo"),
        };
        driver.set_count(&logo.selector, 1);
        discovery.visit_all(&[logo.clone()], wait).await.unwrap();
        assert_eq!(driver.clicks(), vec![logo.selector.clone()]);

        driver.set_count(&logo.selector, 2);
        assert!(matches!(
            discovery.visit_all(&[logo], wait).await,
            Err(ScenarioError::DiscoveryAnomaly(_))
        ));
    }

    #[tokio::test]
    async fn hidden_settings_time_out() {
        let driver = FakeDriver::new();
        let model = fake_model(&driver);
        let logo = TabDescriptor {
            id: "logo".into(),
            selector: tab_selector("ng-click", "logo"),
        };
        driver.set_count(&logo.selector, 1);

        let result = TabDiscovery::new(&model)
            .visit_all(
                &[logo],
                WaitConfig::new(Duration::from_millis(30), Duration::from_millis(5)),
            )
            .await;
        assert!(matches!(result, Err(ScenarioError::Timeout { .. })));
    }

    proptest! {
        #[test]
        fn wrapped_identifiers_round_trip(id in "[A-Za-z0-9_ -]{0,24}") {
            let attribute = format!("setTab('{id}')");
            prop_assert_eq!(extract_tab_id(&attribute), Some(id.clone()));
            prop_assert!(tab_selector("ng-click", &id).contains(&attribute));
        }

        #[test]
        fn extraction_never_panics(attr in ".*") {
            let _ = extract_tab_id(&attr);
        }
    }
}
