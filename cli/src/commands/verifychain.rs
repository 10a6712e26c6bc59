use std::io::Write;

use anyhow::Context;
use powchain::{BlockStore, Blockchain};

pub fn run<S, W>(chain: &Blockchain<S>, out: &mut W) -> anyhow::Result<()>
where
    S: BlockStore,
    W: Write,
{
    let report = chain.verify().context("chain verification failed")?;
    writeln!(out, "Chain OK: {} blocks, tip {}", report.blocks, report.tip)?;
    Ok(())
}
