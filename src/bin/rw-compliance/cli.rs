//! Command-line interface definitions for the compliance runner.

use std::path::PathBuf;

use clap::Parser;

use rw_compliance::config::RunConfig;

/// Command-line arguments for the compliance runner.
///
/// Every setting except `--config`, `--list` and `--json` can also come from
/// the configuration file; flags win over file values.
#[derive(Debug, Parser)]
#[command(name = "rw-compliance")]
#[command(
    author,
    version,
    about = "Remote write compliance harness: serves a scrape target, receives writes, checks them"
)]
pub struct Cli {
    /// Path to YAML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Address the remote write receiver listens on [default: 127.0.0.1:19095]
    #[arg(long)]
    pub receiver_listen: Option<String>,

    /// Address the scrape target listens on [default: 127.0.0.1:19096]
    #[arg(long)]
    pub exposition_listen: Option<String>,

    /// How long the sender runs against each case (e.g. 15s, 1m) [default: 15s]
    #[arg(long)]
    pub window: Option<String>,

    /// Relative tolerance for time-varying values [default: 1e-7]
    #[arg(long)]
    pub tolerance: Option<f64>,

    /// Regex selecting which cases to run
    #[arg(long)]
    pub cases: Option<String>,

    /// Print the case catalogue and exit
    #[arg(long)]
    pub list: bool,

    /// Print the final summary as JSON
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Settings given as flags, to be layered over the configuration file.
    pub fn overrides(&self) -> RunConfig {
        RunConfig {
            receiver_listen: self.receiver_listen.clone(),
            exposition_listen: self.exposition_listen.clone(),
            window: self.window.clone(),
            tolerance: self.tolerance,
            cases: self.cases.clone(),
        }
    }
}
