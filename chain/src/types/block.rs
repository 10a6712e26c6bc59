// chain/src/types/block.rs

//! Block types.
//!
//! A [`Block`] is one immutable ledger entry: a payload, the time it was
//! created, a link to its parent, and the proof-of-work `(nonce, hash)`
//! pair that seals it. Blocks are never mutated after construction; the
//! only way to obtain one is to mine a [`BlockTemplate`] or to decode a
//! stored block.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use super::BlockHash;
use crate::pow::{CancelFlag, PowError, ProofOfWork};

/// Payload carried by the genesis block.
pub const GENESIS_PAYLOAD: &str = "Genesis Block";

/// The unsealed part of a block: every field that feeds the proof-of-work
/// preimage except the nonce.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockTemplate {
    /// Wall-clock timestamp, in seconds since Unix epoch.
    pub timestamp: i64,
    /// Opaque ledger entry. Any string is accepted.
    pub payload: String,
    /// Hash of the previous block; `None` only for genesis.
    pub parent: Option<BlockHash>,
}

impl BlockTemplate {
    /// Builds a template stamped with the current time.
    pub fn new(payload: impl Into<String>, parent: Option<BlockHash>) -> Self {
        Self {
            timestamp: current_unix_timestamp(),
            payload: payload.into(),
            parent,
        }
    }

    /// Template for the genesis block.
    pub fn genesis() -> Self {
        Self::new(GENESIS_PAYLOAD, None)
    }
}

/// A sealed, immutable block.
///
/// `hash` and `nonce` are always the output of the same proof-of-work
/// search over the other three fields; there is no API that sets one
/// without the other.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    timestamp: i64,
    payload: String,
    parent: Option<BlockHash>,
    hash: BlockHash,
    nonce: u64,
}

impl Block {
    /// Mines the genesis block (fixed payload, no parent).
    pub fn genesis(pow: &ProofOfWork) -> Result<Self, PowError> {
        Self::mine(GENESIS_PAYLOAD, None, pow)
    }

    /// Creates and mines a new block on top of `parent`.
    ///
    /// This runs the proof-of-work search synchronously on the calling
    /// thread. Async callers should go through [`crate::pow::Miner`].
    pub fn mine(
        payload: impl Into<String>,
        parent: Option<BlockHash>,
        pow: &ProofOfWork,
    ) -> Result<Self, PowError> {
        let template = BlockTemplate::new(payload, parent);
        let (nonce, hash) = pow.run(&template, &CancelFlag::new())?;
        Ok(Self::seal(template, nonce, hash))
    }

    /// Combines a template with the result of a proof-of-work search.
    pub(crate) fn seal(template: BlockTemplate, nonce: u64, hash: BlockHash) -> Self {
        Self {
            timestamp: template.timestamp,
            payload: template.payload,
            parent: template.parent,
            hash,
            nonce,
        }
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Parent link, `None` for genesis.
    pub fn parent(&self) -> Option<&BlockHash> {
        self.parent.as_ref()
    }

    /// Parent hash as hex; the empty string for genesis.
    pub fn parent_hex(&self) -> String {
        self.parent.map(|p| p.to_hex()).unwrap_or_default()
    }

    pub fn hash(&self) -> &BlockHash {
        &self.hash
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn is_genesis(&self) -> bool {
        self.parent.is_none()
    }
}

/// Returns the current wall-clock time as seconds since Unix epoch.
///
/// On error (system clock before epoch) this falls back to 0.
fn current_unix_timestamp() -> i64 {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_secs();
    i64::try_from(secs).unwrap_or(i64::MAX)
}
