use std::process::ExitCode;

use anyhow::{anyhow, Context};
use clap::Parser;
use rhflow_cli::{execute, init_logging, logging_config, Cli};

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(&logging_config())
        .map_err(|error| anyhow!(error))
        .context("failed to initialize logging")?;
    Ok(execute(cli))
}
