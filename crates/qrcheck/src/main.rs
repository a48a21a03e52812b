//! qrcheck - end-to-end verification of a web QR generator.

use clap::Parser;
use miette::{IntoDiagnostic, Result, miette};
use qrcheck::cli::Cli;
use qrcheck::config::QrCheckConfig;
use qrcheck::logger;
use qrcheck::scenario::ScenarioSuite;
use qrcheck_browser::TestBrowser;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    logger::init_logger(args.verbose, args.quiet, args.no_color);

    let mut config = QrCheckConfig::load(args.config.as_deref()).into_diagnostic()?;
    args.apply_overrides(&mut config);
    let config = config.validated().into_diagnostic()?;

    let scenarios = args.selected_scenarios();
    info!(base_url = %config.base_url, target = %config.target, count = scenarios.len(), "starting suite");

    let browser = TestBrowser::launch(config.browser_config())
        .await
        .into_diagnostic()?;
    let suite = ScenarioSuite::new(config).into_diagnostic()?;
    let report = suite.run(&browser, &scenarios).await;

    if let Err(e) = browser.close().await {
        warn!(error = %e, "browser did not shut down cleanly");
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
    }

    let failures = report.failures();
    if failures.is_empty() {
        info!(count = report.scenarios.len(), "all scenarios passed");
        return Ok(());
    }

    let summary: Vec<String> = failures
        .iter()
        .map(|r| format!("  {}: {}", r.scenario, r.failure.as_deref().unwrap_or("failed")))
        .collect();
    Err(miette!(
        "{} of {} scenarios failed:\n{}",
        failures.len(),
        report.scenarios.len(),
        summary.join("\n")
    ))
}
