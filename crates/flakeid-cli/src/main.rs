#![doc = include_str!("../README.md")]

mod cli;

use std::io::{BufWriter, Write};

use clap::Parser;
use cli::commands;
use cli::config::{CliArgs, Command, Config};
use cli::telemetry::init_logging;
use flakeid::{MonotonicClock, SystemClock};

fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = Config::try_from(args)?;

    init_logging()?;
    tracing::debug!(?config, "starting");

    let mut out = BufWriter::new(std::io::stdout().lock());
    match &config.command {
        Command::Generate {
            count,
            monotonic: true,
            max_retries,
        } => commands::generate(&config, MonotonicClock::new(), *count, *max_retries, &mut out)?,
        Command::Generate {
            count,
            monotonic: false,
            max_retries,
        } => commands::generate(&config, SystemClock, *count, *max_retries, &mut out)?,
        Command::Parse { ids } => commands::parse(&config, ids, &mut out)?,
    }
    out.flush()?;

    Ok(())
}
