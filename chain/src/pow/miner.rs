//! Off-thread mining.
//!
//! The proof-of-work search is CPU-bound and can run for a long time, so
//! async callers hand it to Tokio's blocking pool through a [`Miner`] and
//! await the result. A [`CancelFlag`] shared with the search lets the
//! caller stop it early.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::types::{Block, BlockTemplate};

use super::{PowError, ProofOfWork};

/// Cooperative cancellation signal for a running search.
///
/// Clones share the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Result of a successful search.
#[derive(Clone, Debug)]
pub struct MinedBlock {
    pub block: Block,
    /// Number of digests computed (`nonce + 1`).
    pub attempts: u64,
    pub elapsed_secs: f64,
}

/// Dispatches proof-of-work searches onto the blocking thread pool.
#[derive(Clone, Copy, Debug, Default)]
pub struct Miner {
    pow: ProofOfWork,
}

impl Miner {
    pub fn new(pow: ProofOfWork) -> Self {
        Self { pow }
    }

    pub fn pow(&self) -> &ProofOfWork {
        &self.pow
    }

    /// Seals `template` on a blocking worker and waits for the result.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn mine(
        &self,
        template: BlockTemplate,
        cancel: CancelFlag,
    ) -> Result<MinedBlock, PowError> {
        let pow = self.pow;
        tracing::info!(
            payload_len = template.payload.len(),
            target_bits = pow.target_bits(),
            "mining block"
        );

        let mined = tokio::task::spawn_blocking(move || {
            let start = Instant::now();
            let (nonce, hash) = pow.run(&template, &cancel)?;
            Ok::<_, PowError>(MinedBlock {
                block: Block::seal(template, nonce, hash),
                attempts: nonce.saturating_add(1),
                elapsed_secs: start.elapsed().as_secs_f64(),
            })
        })
        .await
        .map_err(|e| PowError::Worker(e.to_string()))??;

        tracing::info!(
            nonce = mined.block.nonce(),
            hash = %mined.block.hash(),
            elapsed_secs = mined.elapsed_secs,
            "mined block"
        );
        Ok(mined)
    }
}
