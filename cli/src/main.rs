// cli/src/main.rs

//! `powchain` command-line front end.
//!
//! - `addblock -data <TEXT>`: mine and append a block,
//! - `printchain`: list every block from the tip back to genesis,
//! - `verifychain`: re-check proof-of-work and links of the whole chain.
//!
//! Missing or unknown commands print the usage text and exit 0. Failures
//! after the store is open are reported on stderr with exit code 1; the
//! store is closed on every path.

mod args;
mod commands;
mod config;

use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use clap::error::ErrorKind;
use tracing_subscriber::EnvFilter;

use args::{Cli, Command, USAGE, normalize_legacy_flags};
use powchain::DefaultBlockchain;

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = match Cli::try_parse_from(normalize_legacy_flags(std::env::args_os())) {
        Ok(cli) => cli,
        Err(e) => {
            match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                    let _ = e.print();
                }
                _ => println!("{USAGE}"),
            }
            return ExitCode::SUCCESS;
        }
    };

    if matches!(&cli.command, Command::AddBlock { data } if data.is_empty()) {
        println!("{USAGE}");
        return ExitCode::SUCCESS;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout only carries command output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let cfg = config::chain_config(&cli.global);

    let chain = DefaultBlockchain::open_with_config(&cfg)
        .await
        .with_context(|| format!("failed to open blockchain at {}", cfg.storage.path))?;

    let mut stdout = io::stdout().lock();
    let result = commands::dispatch(&chain, cli.command, &mut stdout)
        .await
        .and_then(|()| Ok(stdout.flush()?));

    if cli.global.metrics {
        match chain.metrics().gather_text() {
            Ok(text) => eprint!("{text}"),
            Err(e) => tracing::warn!("failed to render metrics: {e}"),
        }
    }

    let closed = chain.close().context("failed to close blockchain");
    result?;
    closed
}
