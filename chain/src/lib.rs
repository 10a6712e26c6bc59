//! Chain library crate.
//!
//! This crate provides a single-node, append-only ledger of hash-linked
//! proof-of-work blocks persisted in an embedded key-value store:
//!
//! - strongly-typed domain types (`types`),
//! - the proof-of-work engine and off-thread miner (`pow`),
//! - the block codec (`codec`),
//! - storage backends (`storage`),
//! - the persistent chain store and its iterator (`chain`),
//! - Prometheus-based metrics (`metrics`),
//! - and a top-level configuration (`config`).
//!
//! Binaries compose these pieces; see the `powchain` CLI.

pub mod chain;
pub mod codec;
pub mod config;
pub mod error;
pub mod metrics;
pub mod pow;
pub mod storage;
pub mod types;

// Re-export top-level configuration types.
pub use config::{ChainConfig, PowConfig};

// Re-export the chain store and its traversal.
pub use chain::{Blockchain, ChainIterator, ChainReport};
pub use error::ChainError;

// Re-export proof-of-work and codec entry points.
pub use codec::{CodecError, decode_block, encode_block};
pub use pow::{CancelFlag, Miner, PowError, ProofOfWork, TARGET_BITS};

// Re-export storage backends.
pub use storage::{
    BlockStore, InMemoryBlockStore, SledBlockStore, SledConfig, StorageError, TIP_KEY,
};

// Re-export metrics registry.
pub use metrics::{ChainMetrics, MetricsRegistry};

// Re-export domain types at the crate root for convenience.
pub use types::*;

/// Type alias for the default block store backend.
pub type DefaultBlockStore = SledBlockStore;

/// Type alias for a chain over the default backend.
pub type DefaultBlockchain = Blockchain<DefaultBlockStore>;
