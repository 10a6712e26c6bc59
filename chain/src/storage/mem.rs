//! In-memory block store.
//!
//! This implementation is useful for unit tests and benchmarks. It keeps
//! the same key layout as the persistent store (encoded blocks under
//! their hex hash, the tip under [`TIP_KEY`]) in a `HashMap` behind a
//! lock, and can be told to fail commits to exercise error paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use super::{BlockStore, StorageError, TIP_KEY, block_key, parse_tip};
use crate::codec::{decode_block, encode_block};
use crate::types::{Block, BlockHash};

/// In-memory implementation of [`BlockStore`].
#[derive(Default)]
pub struct InMemoryBlockStore {
    entries: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
    fail_commits: AtomicBool,
}

impl InMemoryBlockStore {
    /// Creates a new, empty in-memory block store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of entries (blocks plus tip) currently stored.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Makes every subsequent [`BlockStore::commit_block`] fail as if the
    /// write transaction hit an I/O error.
    pub fn set_fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Writes raw bytes under `key`, bypassing the codec.
    pub fn insert_raw(&self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.entries.write().insert(key.into(), value.into());
    }

    /// Removes `key`, returning the previous value.
    pub fn remove_raw(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.entries.write().remove(key)
    }

    /// Copy of every entry, for before/after comparisons.
    pub fn snapshot(&self) -> HashMap<Vec<u8>, Vec<u8>> {
        self.entries.read().clone()
    }
}

impl BlockStore for InMemoryBlockStore {
    fn get_block(&self, hash: &BlockHash) -> Result<Option<Block>, StorageError> {
        let key = block_key(hash);
        let entries = self.entries.read();
        match entries.get(key.as_bytes()) {
            None => Ok(None),
            Some(bytes) => decode_block(bytes)
                .map(Some)
                .map_err(|source| StorageError::Decode { key, source }),
        }
    }

    fn tip(&self) -> Result<Option<BlockHash>, StorageError> {
        self.entries
            .read()
            .get(TIP_KEY)
            .map(|bytes| parse_tip(bytes))
            .transpose()
    }

    fn has_entries(&self) -> Result<bool, StorageError> {
        Ok(!self.is_empty())
    }

    fn initialize(&self, genesis: &Block) -> Result<(), StorageError> {
        let bytes = encode_block(genesis).map_err(StorageError::Encode)?;
        let mut entries = self.entries.write();
        if !entries.is_empty() {
            return Err(StorageError::AlreadyInitialized("memory".to_string()));
        }
        let hex = block_key(genesis.hash());
        entries.insert(hex.clone().into_bytes(), bytes);
        entries.insert(TIP_KEY.to_vec(), hex.into_bytes());
        Ok(())
    }

    fn commit_block(&self, block: &Block, expected_tip: &BlockHash) -> Result<(), StorageError> {
        let bytes = encode_block(block).map_err(StorageError::Encode)?;

        // The write lock is the transaction: all checks happen before the
        // first mutation, so a failure leaves the map untouched.
        let mut entries = self.entries.write();
        let current = entries.get(TIP_KEY).map(|b| parse_tip(b)).transpose()?;
        if current.as_ref() != Some(expected_tip) {
            return Err(StorageError::TipMoved {
                expected: expected_tip.to_hex(),
                found: current.map(|h| h.to_hex()).unwrap_or_default(),
            });
        }
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(StorageError::Injected("commit"));
        }

        let hex = block_key(block.hash());
        entries.insert(hex.clone().into_bytes(), bytes);
        entries.insert(TIP_KEY.to_vec(), hex.into_bytes());
        Ok(())
    }

    fn flush(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
