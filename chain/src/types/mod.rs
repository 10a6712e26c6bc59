//! Core domain types used by the chain
//!
//! This module defines the strongly-typed hashes shared across the chain
//! implementation. The goal is to avoid "naked" byte buffers and hex
//! strings in public APIs and instead use domain-specific newtypes.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Block values and their construction.
pub mod block;

pub use block::{Block, BlockTemplate, GENESIS_PAYLOAD};

/// Length in bytes of all 256-bit hash types used in this module.
pub const HASH_LEN: usize = 32;

/// Error returned when a hex string does not describe a [`Hash256`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid hash hex {input:?}: {reason}")]
pub struct ParseHashError {
    input: String,
    reason: String,
}

/// Strongly-typed 256-bit hash wrapper (SHA-256).
///
/// Always exactly [`HASH_LEN`] bytes long. Ordering is big-endian, so
/// comparing two `Hash256` values compares them as 256-bit unsigned
/// integers.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Hash256(pub [u8; HASH_LEN]);

impl Hash256 {
    /// Computes a new [`Hash256`] as the SHA-256 digest of `data`.
    pub fn compute(data: &[u8]) -> Self {
        Hash256(Sha256::digest(data).into())
    }

    /// Returns the underlying 32-byte hash as a borrowed array.
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// Lowercase hex encoding (64 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, ParseHashError> {
        let mut out = [0u8; HASH_LEN];
        hex::decode_to_slice(s, &mut out).map_err(|e| ParseHashError {
            input: s.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Hash256(out))
    }
}

/// Strongly-typed block hash.
///
/// This is the proof-of-work digest of a [`Block`]. On disk and on screen
/// it always appears as lowercase hex; the hex form is also the block's
/// key in the store.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct BlockHash(pub Hash256);

impl BlockHash {
    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }

    pub fn from_hex(s: &str) -> Result<Self, ParseHashError> {
        Hash256::from_hex(s).map(BlockHash)
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
