//! sled-backed block store.
//!
//! This implementation persists the chain in a single sled tree (the
//! namespace, `"blocks"` by default):
//!
//! - `<hex hash>`: encoded block bytes,
//! - `"l"`:        hex hash of the current tip.
//!
//! Multi-key writes go through sled tree transactions, so a block and the
//! tip that points at it become visible together or not at all.

use std::path::Path;
#[cfg(test)]
use std::sync::atomic::{AtomicBool, Ordering};

use ::sled::transaction::{
    ConflictableTransactionError, ConflictableTransactionResult, TransactionError,
    TransactionResult, TransactionalTree,
};
use ::sled::{Db, Tree};

use super::{
    BlockStore, DEFAULT_DB_PATH, DEFAULT_NAMESPACE, StorageError, TIP_KEY, block_key, parse_tip,
};
use crate::codec::{decode_block, encode_block};
use crate::types::{Block, BlockHash};

/// Configuration for [`SledBlockStore`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SledConfig {
    /// Filesystem path to the sled database directory.
    pub path: String,
    /// Name of the tree holding blocks and the tip.
    pub namespace: String,
}

impl Default for SledConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_DB_PATH.to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

/// sled-backed implementation of [`BlockStore`].
pub struct SledBlockStore {
    db: Db,
    tree: Tree,
    namespace: String,
    #[cfg(test)]
    fail_after_insert: AtomicBool,
}

impl SledBlockStore {
    /// Opens (or creates) the database at `cfg.path` and its namespace
    /// tree.
    ///
    /// Fails if the directory is inaccessible or another process holds
    /// the database lock.
    pub fn open(cfg: &SledConfig) -> Result<Self, StorageError> {
        let db = ::sled::Config::new().path(Path::new(&cfg.path)).open()?;
        let tree = db.open_tree(cfg.namespace.as_bytes())?;
        tracing::debug!(path = %cfg.path, namespace = %cfg.namespace, "opened sled store");

        Ok(Self {
            db,
            tree,
            namespace: cfg.namespace.clone(),
            #[cfg(test)]
            fail_after_insert: AtomicBool::new(false),
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Aborts the next commits after the block insert but before the tip
    /// update, to check that the transaction rolls back as a whole.
    #[cfg(test)]
    pub(crate) fn set_fail_after_insert(&self, fail: bool) {
        self.fail_after_insert.store(fail, Ordering::SeqCst);
    }

    fn insert_and_move_tip(
        &self,
        tx: &TransactionalTree,
        key: &str,
        bytes: &[u8],
    ) -> ConflictableTransactionResult<(), StorageError> {
        tx.insert(key.as_bytes(), bytes)?;
        #[cfg(test)]
        if self.fail_after_insert.load(Ordering::SeqCst) {
            return Err(ConflictableTransactionError::Abort(StorageError::Injected(
                "after block insert",
            )));
        }
        tx.insert(TIP_KEY, key.as_bytes())?;
        Ok(())
    }
}

fn finish<T>(result: TransactionResult<T, StorageError>) -> Result<T, StorageError> {
    result.map_err(|e| match e {
        TransactionError::Abort(e) => e,
        TransactionError::Storage(e) => StorageError::Sled(e),
    })
}

impl BlockStore for SledBlockStore {
    fn get_block(&self, hash: &BlockHash) -> Result<Option<Block>, StorageError> {
        let key = block_key(hash);
        match self.tree.get(key.as_bytes())? {
            None => Ok(None),
            Some(bytes) => decode_block(&bytes)
                .map(Some)
                .map_err(|source| StorageError::Decode { key, source }),
        }
    }

    fn tip(&self) -> Result<Option<BlockHash>, StorageError> {
        self.tree.get(TIP_KEY)?.map(|bytes| parse_tip(&bytes)).transpose()
    }

    fn has_entries(&self) -> Result<bool, StorageError> {
        Ok(!self.tree.is_empty())
    }

    fn initialize(&self, genesis: &Block) -> Result<(), StorageError> {
        if !self.tree.is_empty() {
            return Err(StorageError::AlreadyInitialized(self.namespace.clone()));
        }

        let bytes = encode_block(genesis).map_err(StorageError::Encode)?;
        let key = block_key(genesis.hash());

        finish(self.tree.transaction(|tx| {
            if tx.get(TIP_KEY)?.is_some() {
                return Err(ConflictableTransactionError::Abort(
                    StorageError::AlreadyInitialized(self.namespace.clone()),
                ));
            }
            self.insert_and_move_tip(tx, &key, &bytes)
        }))?;

        tracing::debug!(hash = %genesis.hash(), namespace = %self.namespace, "stored genesis block");
        Ok(())
    }

    fn commit_block(&self, block: &Block, expected_tip: &BlockHash) -> Result<(), StorageError> {
        let bytes = encode_block(block).map_err(StorageError::Encode)?;
        let key = block_key(block.hash());
        let expected = expected_tip.to_hex();

        finish(self.tree.transaction(|tx| {
            let current = tx.get(TIP_KEY)?;
            if current.as_deref() != Some(expected.as_bytes()) {
                let found = current
                    .map(|v| String::from_utf8_lossy(&v).into_owned())
                    .unwrap_or_default();
                return Err(ConflictableTransactionError::Abort(StorageError::TipMoved {
                    expected: expected.clone(),
                    found,
                }));
            }
            self.insert_and_move_tip(tx, &key, &bytes)
        }))?;

        tracing::debug!(hash = %block.hash(), parent = %expected, "committed block");
        Ok(())
    }

    fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }
}
