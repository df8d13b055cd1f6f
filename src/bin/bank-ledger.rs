use std::{
    fs::File,
    io::{self, Read},
    path::PathBuf,
};

use anyhow::{Context, Result};
use bank_ledger::{
    bin_utils::Service,
    config::{DEFAULT_CAPACITY, DEFAULT_WORKERS, LedgerConfig},
};
use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Runs ledger requests from a file (or stdin) and prints one CSV row per request.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Request script, one request per line. Reads stdin when omitted.
    input: Option<PathBuf>,
    /// Maximum number of accounts.
    #[arg(long, default_value_t = DEFAULT_CAPACITY)]
    capacity: usize,
    /// Number of worker threads.
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,
    /// Also write the final account table as CSV to this file.
    #[arg(long)]
    accounts: Option<PathBuf>,
}

fn main() -> Result<()> {
    // stdout carries the CSV, logs go to stderr
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args = Args::parse();
    let input: Box<dyn Read> = match &args.input {
        Some(path) => Box::new(
            File::open(path).with_context(|| format!("Failed to open `{}`", path.display()))?,
        ),
        None => Box::new(io::stdin()),
    };
    let mut accounts_file = args
        .accounts
        .as_ref()
        .map(|path| {
            File::create(path).with_context(|| format!("Failed to create `{}`", path.display()))
        })
        .transpose()?;

    let service = Service {
        input,
        output: &mut io::stdout(),
        accounts_output: accounts_file.as_mut().map(|file| file as &mut dyn io::Write),
        config: LedgerConfig {
            capacity: args.capacity,
            workers: args.workers,
        },
    };
    service.run()
}
