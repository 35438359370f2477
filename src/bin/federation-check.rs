//! # Federation Check
//!
//! Runs the SAML federation scenarios against an acceptance environment and
//! prints one JSON report per scenario.
//!
//! ## Usage
//!
//! ```bash
//! BASE_URL=login.uaa-acceptance.cf-app.com \
//! ADFS_METADATA_PATH=./adfs-metadata.xml \
//!     federation-check --scenario all --report federation-report.json
//! ```
//!
//! Everything except the scenario selection and the report path comes from
//! the environment; see [`federation_check::config`]. Exits non-zero if
//! configuration is invalid, the environment is not allow-listed, or any
//! scenario fails.

use clap::{Parser, ValueEnum};
use federation_check::browser::WebDriverBrowser;
use federation_check::report::all_passed;
use federation_check::{
    AcceptanceConfig, FederationError, FederationResult, IdentityClient, Scenario,
    ScenarioReport, ScenarioRunner,
};
use log::{error, info, warn};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ScenarioSelection {
    /// Both scenarios, system zone first
    All,
    /// Only the system zone
    System,
    /// Only the secondary zone
    Zone,
}

impl ScenarioSelection {
    fn scenarios(self) -> Vec<Scenario> {
        match self {
            Self::All => Scenario::all().to_vec(),
            Self::System => vec![Scenario::SystemZone],
            Self::Zone => vec![Scenario::SecondaryZone],
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "federation-check", version, about = "Verify SAML federation end to end")]
struct Cli {
    /// Which scenarios to run
    #[arg(long, value_enum, default_value_t = ScenarioSelection::All)]
    scenario: ScenarioSelection,

    /// Also write the JSON reports to this file
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();
    match run(&cli).await {
        Ok(reports) if all_passed(&reports) => ExitCode::SUCCESS,
        Ok(reports) => {
            let failed = reports.iter().filter(|r| !r.passed()).count();
            error!("{} of {} scenario(s) failed", failed, reports.len());
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> FederationResult<Vec<ScenarioReport>> {
    let config = AcceptanceConfig::load()?;
    config.guard()?;
    let metadata = config.read_metadata()?;
    info!(
        "Running {:?} against {}",
        cli.scenario,
        config.base_url_with_protocol()
    );

    let api = IdentityClient::new(config.http_timeout)?;
    let browser = WebDriverBrowser::connect(&config.webdriver_url, config.element_timeout).await?;

    let reports = match ScenarioRunner::new(&api, &browser, &config, metadata) {
        Ok(mut runner) => runner.run_all(&cli.scenario.scenarios()).await,
        Err(e) => Err(e),
    };
    if let Err(e) = browser.close().await {
        warn!("Failed to close the browser session: {}", e);
    }
    let reports = reports?;

    let json = serde_json::to_string_pretty(&reports)?;
    println!("{json}");
    if let Some(path) = &cli.report {
        std::fs::write(path, &json).map_err(|e| {
            FederationError::config(format!("cannot write report {}: {}", path.display(), e))
        })?;
        info!("Wrote report to {}", path.display());
    }
    Ok(reports)
}
