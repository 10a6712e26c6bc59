//! Proof-of-work engine.
//!
//! A block is sealed by finding a `nonce` such that
//!
//! ```text
//! SHA-256(parent_hex ‖ payload ‖ timestamp ‖ target_bits ‖ nonce) < 2^(256 - target_bits)
//! ```
//!
//! where every field is rendered as text (integers in decimal) and
//! `parent_hex` is empty for genesis. The concatenation order and format
//! are part of the on-disk contract: changing either invalidates every
//! previously mined block.

pub mod miner;

pub use miner::{CancelFlag, Miner};

use crate::types::{Block, BlockHash, BlockTemplate, HASH_LEN, Hash256};

/// Default difficulty: number of leading zero bits a block hash must have.
pub const TARGET_BITS: u32 = 24;

/// How many nonces are tried between two looks at the cancellation flag.
const CANCEL_CHECK_INTERVAL: u64 = 1 << 12;

/// Errors produced by the proof-of-work search.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PowError {
    /// `target_bits` outside `1..=255`.
    #[error("target bits must be in 1..=255, got {0}")]
    InvalidTargetBits(u32),
    /// The search was cancelled before a valid nonce was found.
    #[error("mining cancelled")]
    Cancelled,
    /// Every representable nonce was tried without success.
    #[error("nonce space exhausted")]
    Exhausted,
    /// The blocking worker running the search died.
    #[error("mining worker failed: {0}")]
    Worker(String),
}

/// Fixed-target proof-of-work.
///
/// Holds no per-block state: [`ProofOfWork::run`] and
/// [`ProofOfWork::validate`] are pure functions of their arguments, so
/// one value can be shared freely between threads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProofOfWork {
    target_bits: u32,
    target: Hash256,
}

impl Default for ProofOfWork {
    fn default() -> Self {
        Self {
            target_bits: TARGET_BITS,
            target: target_for_bits(TARGET_BITS),
        }
    }
}

impl ProofOfWork {
    /// Creates an engine whose target is `2^(256 - target_bits)`.
    pub fn new(target_bits: u32) -> Result<Self, PowError> {
        if !(1..=255).contains(&target_bits) {
            return Err(PowError::InvalidTargetBits(target_bits));
        }
        Ok(Self {
            target_bits,
            target: target_for_bits(target_bits),
        })
    }

    pub fn target_bits(&self) -> u32 {
        self.target_bits
    }

    /// The target as a big-endian 256-bit value.
    pub fn target(&self) -> &Hash256 {
        &self.target
    }

    /// Returns `true` if `digest`, read as a big-endian integer, is
    /// strictly below the target.
    pub fn meets_target(&self, digest: &Hash256) -> bool {
        *digest < self.target
    }

    /// Builds the full hash preimage for `nonce`.
    pub fn prepare_data(&self, template: &BlockTemplate, nonce: u64) -> Vec<u8> {
        let mut data =
            self.preimage_prefix(template.parent.as_ref(), &template.payload, template.timestamp);
        data.push_str(&nonce.to_string());
        data.into_bytes()
    }

    /// Searches nonces upward from zero and returns the first one whose
    /// digest meets the target, together with that digest.
    ///
    /// `cancel` is polled every few thousand attempts.
    pub fn run(
        &self,
        template: &BlockTemplate,
        cancel: &CancelFlag,
    ) -> Result<(u64, BlockHash), PowError> {
        let prefix =
            self.preimage_prefix(template.parent.as_ref(), &template.payload, template.timestamp);
        let mut buf = String::with_capacity(prefix.len() + 20);
        let mut nonce: u64 = 0;

        loop {
            if nonce % CANCEL_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
                return Err(PowError::Cancelled);
            }

            buf.clear();
            buf.push_str(&prefix);
            buf.push_str(&nonce.to_string());
            let digest = Hash256::compute(buf.as_bytes());

            if self.meets_target(&digest) {
                return Ok((nonce, BlockHash(digest)));
            }
            nonce = nonce.checked_add(1).ok_or(PowError::Exhausted)?;
        }
    }

    /// Recomputes the digest from the block's stored fields and nonce.
    pub fn digest(&self, block: &Block) -> Hash256 {
        let mut data = self.preimage_prefix(block.parent(), block.payload(), block.timestamp());
        data.push_str(&block.nonce().to_string());
        Hash256::compute(data.as_bytes())
    }

    /// A block is valid when its recomputed digest meets the target and
    /// equals the stored hash.
    pub fn validate(&self, block: &Block) -> bool {
        let digest = self.digest(block);
        self.meets_target(&digest) && digest == block.hash().0
    }

    fn preimage_prefix(&self, parent: Option<&BlockHash>, payload: &str, timestamp: i64) -> String {
        let mut prefix = String::with_capacity(2 * HASH_LEN + payload.len() + 24);
        if let Some(parent) = parent {
            prefix.push_str(&parent.to_hex());
        }
        prefix.push_str(payload);
        prefix.push_str(&timestamp.to_string());
        prefix.push_str(&self.target_bits.to_string());
        prefix
    }
}

/// `1 << (256 - bits)` as a big-endian 32-byte value. `bits` must be in
/// `1..=255`.
fn target_for_bits(bits: u32) -> Hash256 {
    let shift = (256 - bits) as usize;
    let mut target = [0u8; HASH_LEN];
    target[HASH_LEN - 1 - shift / 8] = 1 << (shift % 8);
    Hash256(target)
}
