//! Subcommand implementations.
//!
//! Each command borrows an open chain and writes its output to the given
//! writer, so it can be exercised against an in-memory store in tests.

pub mod addblock;
pub mod printchain;
pub mod verifychain;

use std::io::Write;

use powchain::{BlockStore, Blockchain};

use crate::args::Command;

/// Runs `command` against `chain`.
pub async fn dispatch<S, W>(
    chain: &Blockchain<S>,
    command: Command,
    out: &mut W,
) -> anyhow::Result<()>
where
    S: BlockStore,
    W: Write,
{
    match command {
        Command::AddBlock { data } => addblock::run(chain, data, out).await,
        Command::PrintChain => printchain::run(chain, out),
        Command::VerifyChain => verifychain::run(chain, out),
    }
}
