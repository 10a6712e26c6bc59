use std::io::Write;

use powchain::{Block, BlockStore, Blockchain, ProofOfWork};

/// Prints every block from the tip back to genesis.
///
/// A block that cannot be read stops the listing with an error.
pub fn run<S, W>(chain: &Blockchain<S>, out: &mut W) -> anyhow::Result<()>
where
    S: BlockStore,
    W: Write,
{
    for block in chain.iter()? {
        write_block(out, &block?, chain.pow())?;
    }
    Ok(())
}

fn write_block<W: Write>(out: &mut W, block: &Block, pow: &ProofOfWork) -> std::io::Result<()> {
    writeln!(out, "Prev. hash: {}", block.parent_hex())?;
    writeln!(out, "Data: {}", block.payload())?;
    writeln!(out, "Hash: {}", block.hash())?;
    writeln!(out, "Timestamp: {}", block.timestamp())?;
    writeln!(out, "Nonce: {}", block.nonce())?;
    writeln!(out, "PoW: {}", pow.validate(block))?;
    writeln!(out)
}
