#![allow(clippy::uninlined_format_args)]

use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use patrimonial_e2e::errors::E2eError;
use patrimonial_e2e::webdriver_manager::GLOBAL_WEBDRIVER_MANAGER;
use patrimonial_e2e::{
    Browser, BrowserType, Fixtures, RunId, ScenarioRunner, Settings, TeardownAgent, ViewportSize,
};

// Exit codes
const EXIT_SUCCESS: i32 = 0;

#[derive(Parser)]
#[command(name = "patrimonial-e2e")]
#[command(about = "End-to-end scenario and cleanup for Gerência Patrimonial", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Handoff file written by `scenario` and consumed by `teardown`
    #[arg(long, global = true)]
    handoff_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the manager journey in a browser
    Scenario {
        /// Browser to use
        #[arg(short, long)]
        browser: Option<BrowserType>,

        /// Run the browser without a window
        #[arg(long)]
        headless: bool,

        /// Set viewport size (WIDTHxHEIGHT, e.g., 375x667)
        #[arg(long)]
        viewport: Option<String>,

        /// Front end root URL
        #[arg(long)]
        frontend_url: Option<String>,

        /// Directory for failure screenshots
        #[arg(long)]
        screenshot_dir: Option<PathBuf>,

        /// Reuse a specific run identity (10000-99999) instead of a random one
        #[arg(long)]
        run_id: Option<u32>,
    },

    /// Delete the fixtures recorded in the handoff file
    Teardown {
        /// REST API base URL
        #[arg(long)]
        api_url: Option<String>,

        /// Also delete each company's branch offices first
        #[arg(long)]
        purge_branch_offices: bool,
    },

    /// Print the fixture data for a run identity
    Fixtures {
        #[arg(long)]
        run_id: Option<u32>,
    },
}

#[tokio::main]
async fn main() {
    let result = run().await;

    // Statics are never dropped, stop started drivers explicitly
    GLOBAL_WEBDRIVER_MANAGER.stop_all();

    match result {
        Ok(()) => std::process::exit(EXIT_SUCCESS),
        Err(err) => {
            // Output JSON error to stdout for programmatic consumption
            let error_json = json!({
                "error": true,
                "message": err.to_string(),
                "exit_code": err.exit_code()
            });
            println!(
                "{}",
                serde_json::to_string(&error_json).unwrap_or_else(|_| "{}".to_string())
            );

            // Also log to stderr for human reading
            eprintln!("Error: {}", err);
            std::process::exit(err.exit_code());
        }
    }
}

async fn run() -> Result<(), E2eError> {
    // Logs go to stderr so JSON output on stdout stays clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "patrimonial_e2e=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();

    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(path) = cli.handoff_file {
        settings.handoff_file = path;
    }

    match cli.command {
        Commands::Scenario {
            browser,
            headless,
            viewport,
            frontend_url,
            screenshot_dir,
            run_id,
        } => {
            if let Some(browser) = browser {
                settings.browser = browser;
            }
            if headless {
                settings.headless = true;
            }
            if let Some(viewport) = viewport {
                settings.viewport = Some(ViewportSize::parse(&viewport).map_err(|e| {
                    E2eError::Config(format!("Invalid viewport '{}': {}", viewport, e))
                })?);
            }
            if let Some(url) = frontend_url {
                settings.frontend_url = url;
            }
            if let Some(dir) = screenshot_dir {
                settings.screenshot_dir = dir;
            }
            settings.validate()?;

            handle_scenario(&settings, resolve_run_id(run_id)?).await
        }

        Commands::Teardown {
            api_url,
            purge_branch_offices,
        } => {
            if let Some(url) = api_url {
                settings.api_url = url;
            }
            if purge_branch_offices {
                settings.teardown.purge_branch_offices = true;
            }
            settings.validate()?;

            // Remote failures are reported, never turned into a failing exit
            let outcome = TeardownAgent::new(&settings).run().await;
            println!("{}", outcome.to_json());
            Ok(())
        }

        Commands::Fixtures { run_id } => {
            let fixtures = Fixtures::derive(resolve_run_id(run_id)?);
            let output = serde_json::to_string_pretty(&fixtures)
                .map_err(|e| E2eError::Other(e.into()))?;
            println!("{}", output);
            Ok(())
        }
    }
}

fn resolve_run_id(run_id: Option<u32>) -> Result<RunId, E2eError> {
    match run_id {
        Some(value) => Ok(RunId::new(value)?),
        None => Ok(RunId::random()),
    }
}

async fn handle_scenario(settings: &Settings, run_id: RunId) -> Result<(), E2eError> {
    let fixtures = Fixtures::derive(run_id);
    let browser = Browser::connect(settings.browser, settings.viewport, settings.headless)
        .await?;

    let runner = ScenarioRunner::new(&browser, settings, fixtures);
    let result = runner.run_until(interrupted()).await;

    if let Err(e) = browser.close().await {
        warn!("Could not close the browser: {:#}", e);
    }

    let report = result?;
    let output = serde_json::to_string_pretty(&report)
        .map_err(|e| E2eError::Other(e.into()))?;
    println!("{}", output);
    Ok(())
}

/// Resolves on Ctrl-C, or never if the handler cannot be installed
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Could not listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
