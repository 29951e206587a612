//! projalign CLI: align project identifiers or migrate them to UUIDs.
//!
//! Logging goes to stderr. `RUST_LOG` overrides the default filter.

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod args;
mod cmd;
mod io;
mod output;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = args::Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose {
            "projalign_core=debug,projalign=debug"
        } else {
            "warn"
        })
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    output::init(cli.json);

    cmd::dispatch(cli).await
}
