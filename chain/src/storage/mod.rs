//! Storage backends for the chain.
//!
//! The chain lives entirely in one key-value namespace:
//!
//! - `<hex block hash>` -> encoded block ([`crate::codec`]),
//! - `"l"`              -> hex hash of the current tip, as raw bytes.
//!
//! There is no other representation; the chain is rebuilt on demand by
//! following parent links through lookups. This module provides the
//! [`BlockStore`] abstraction over that layout and two implementations:
//!
//! - a sled-backed store ([`sled::SledBlockStore`]) for persistent use,
//! - an in-memory store ([`mem::InMemoryBlockStore`]) for tests.

pub mod mem;
pub mod sled;

pub use self::mem::InMemoryBlockStore;
pub use self::sled::{SledBlockStore, SledConfig};

use crate::codec::CodecError;
use crate::types::{Block, BlockHash, ParseHashError};

/// Reserved key holding the tip hash.
pub const TIP_KEY: &[u8] = b"l";

/// Default namespace (sled tree) holding the chain.
pub const DEFAULT_NAMESPACE: &str = "blocks";

/// Default on-disk location of the store.
pub const DEFAULT_DB_PATH: &str = "blockchain.db";

/// Storage-level error type.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Underlying sled error (I/O, lock held by another process, ...).
    #[error("sled: {0}")]
    Sled(#[from] ::sled::Error),
    /// A block could not be encoded for writing.
    #[error(transparent)]
    Encode(CodecError),
    /// Stored bytes under a block key did not decode.
    #[error("block {key}: {source}")]
    Decode { key: String, source: CodecError },
    /// The tip entry is not a valid hash.
    #[error("corrupted tip entry: {0}")]
    CorruptedTip(#[from] ParseHashError),
    /// The tip moved between reading it and committing on top of it.
    #[error("tip moved: expected {expected}, found {found}")]
    TipMoved { expected: String, found: String },
    /// `initialize` found a namespace that already holds data.
    #[error("namespace {0:?} is already initialized")]
    AlreadyInitialized(String),
    /// Simulated failure (in-memory backend).
    #[error("injected storage failure: {0}")]
    Injected(&'static str),
}

/// Abstract storage interface used by [`crate::chain::Blockchain`].
///
/// Every method takes `&self`: readers may run concurrently with each
/// other and with a writer. Writes are atomic per call; serializing
/// writers is the caller's job.
pub trait BlockStore: Send + Sync {
    /// Fetches a block by hash, if present.
    fn get_block(&self, hash: &BlockHash) -> Result<Option<Block>, StorageError>;

    /// Returns the hash stored under [`TIP_KEY`], if any.
    fn tip(&self) -> Result<Option<BlockHash>, StorageError>;

    /// Returns `true` if the namespace holds any entry at all.
    fn has_entries(&self) -> Result<bool, StorageError>;

    /// Atomically writes `genesis` and points the tip at it.
    ///
    /// Fails with [`StorageError::AlreadyInitialized`] without writing if
    /// the namespace is not empty.
    fn initialize(&self, genesis: &Block) -> Result<(), StorageError>;

    /// Atomically writes `block` and moves the tip to it.
    ///
    /// The commit only happens if the tip still equals `expected_tip`;
    /// otherwise nothing is written and [`StorageError::TipMoved`] is
    /// returned.
    fn commit_block(&self, block: &Block, expected_tip: &BlockHash) -> Result<(), StorageError>;

    /// Makes all committed writes durable.
    fn flush(&self) -> Result<(), StorageError>;
}

/// Storage key of a block.
pub(crate) fn block_key(hash: &BlockHash) -> String {
    hash.to_hex()
}

pub(crate) fn parse_tip(bytes: &[u8]) -> Result<BlockHash, StorageError> {
    let text = String::from_utf8_lossy(bytes);
    Ok(BlockHash::from_hex(&text)?)
}
