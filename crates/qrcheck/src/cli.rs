//! Command-line interface of the `qrcheck` binary.

use crate::config::QrCheckConfig;
use crate::scenario::Scenario;
use clap::Parser;
use std::path::PathBuf;

/// Verify that a web QR generator encodes exactly what was submitted
#[derive(Parser, Debug)]
#[command(
    name = "qrcheck",
    version,
    about = "Verify that a web QR generator encodes exactly what was submitted",
    long_about = "qrcheck drives a real browser against a QR code generator, creates codes,\n\
                  retrieves them by download and by element capture, decodes them and\n\
                  checks that the payload is byte-for-byte the submitted target."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Config file (defaults to ./qrcheck.toml when present)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Entry URL of the generator under test
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Payload to encode and expect back
    #[arg(long, value_name = "TEXT")]
    pub target: Option<String>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Scenario to run; repeat to run several (default: all)
    #[arg(short, long = "scenario", value_enum, value_name = "NAME")]
    pub scenarios: Vec<Scenario>,

    /// Print the suite report as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Applies flag overrides, the highest-priority configuration layer.
    pub fn apply_overrides(&self, config: &mut QrCheckConfig) {
        if let Some(base_url) = &self.base_url {
            config.base_url.clone_from(base_url);
        }
        if let Some(target) = &self.target {
            config.target.clone_from(target);
        }
        if self.headed {
            config.browser.headless = false;
        }
    }

    /// The scenarios to run, in the order given.
    #[must_use]
    pub fn selected_scenarios(&self) -> Vec<Scenario> {
        if self.scenarios.is_empty() {
            Scenario::all().to_vec()
        } else {
            self.scenarios.clone()
        }
    }
}
