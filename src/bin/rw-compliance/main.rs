//! # Remote Write Compliance CLI
//!
//! Runs the selected compliance cases one after another. For each case the
//! runner serves the scrape target and the receiver for one window; the sender
//! under test must be configured (job `test`) to scrape the former and write
//! to the latter.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use rw_compliance::cases;
use rw_compliance::config::RunConfig;
use rw_compliance::runner::run_all;

mod cli;

use cli::Cli;

#[tokio::main]
async fn main() -> io::Result<ExitCode> {
    // Initialize logging
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(env_filter).init();

    // Parse CLI arguments
    let cli = Cli::parse();

    if cli.list {
        for case in cases::catalogue() {
            println!("{:<16} {}", case.name, case.description);
        }
        return Ok(ExitCode::SUCCESS);
    }

    // Load configuration (can work without file - defaults)
    let file = if let Some(path) = &cli.config {
        RunConfig::load_from_path(path)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?
    } else {
        RunConfig::default()
    };
    let settings = file
        .merge(cli.overrides())
        .into_settings()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let selected = cases::select(settings.cases.as_ref());
    if selected.is_empty() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "no case matches --cases"));
    }

    tracing::info!(
        "running {} cases, {:?} each: receiver on http://{}, scrape target on http://{}",
        selected.len(),
        settings.window,
        settings.receiver_addr,
        settings.exposition_addr
    );
    let summary = run_all(&selected, &settings).await;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary).map_err(io::Error::other)?);
    } else {
        println!("{summary}");
    }

    Ok(if summary.passed() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
