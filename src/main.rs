mod app;
mod cli;
mod config;
mod paths;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "PLAYDISPATCH_LOG";

fn main() -> Result<()> {
    init_tracing();
    let cli = cli::Cli::parse();
    app::run(cli)
}

fn init_tracing() {
    // stdout carries results; logs go to stderr.
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
