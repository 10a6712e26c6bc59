//! Newest-to-oldest traversal.

use std::iter::FusedIterator;

use crate::error::ChainError;
use crate::pow::ProofOfWork;
use crate::storage::BlockStore;
use crate::types::{Block, BlockHash};

/// Walks the chain backward from a starting hash by following parent
/// links through store lookups.
///
/// One lookup and decode per step; nothing but the next hash is kept in
/// memory. The iterator ends (`None`) after yielding genesis. A failed
/// lookup or decode is yielded once as `Err` and also ends the
/// traversal. Not restartable: ask the chain for a new iterator to walk
/// again.
///
/// Every yielded block's stored hash equals the digest of its own
/// fields, so parent links cannot form a cycle and the walk is finite.
/// The difficulty target is not checked here.
pub struct ChainIterator<'a, S: ?Sized> {
    store: &'a S,
    pow: ProofOfWork,
    next: Option<BlockHash>,
}

impl<'a, S> ChainIterator<'a, S>
where
    S: BlockStore + ?Sized,
{
    pub fn new(store: &'a S, pow: ProofOfWork, start: BlockHash) -> Self {
        Self {
            store,
            pow,
            next: Some(start),
        }
    }

    /// Hash of the block the next call will yield, if any.
    pub fn peek_hash(&self) -> Option<&BlockHash> {
        self.next.as_ref()
    }

    pub fn is_exhausted(&self) -> bool {
        self.next.is_none()
    }

    fn fetch(&self, hash: &BlockHash) -> Result<Block, ChainError> {
        let block = self.store.get_block(hash)?.ok_or_else(|| {
            ChainError::Integrity(format!("block {hash} is referenced but not stored"))
        })?;
        if block.hash() != hash {
            return Err(ChainError::Integrity(format!(
                "entry {hash} holds block {}",
                block.hash()
            )));
        }
        if self.pow.digest(&block) != hash.0 {
            return Err(ChainError::Integrity(format!(
                "block {hash} does not hash to its stored hash"
            )));
        }
        Ok(block)
    }
}

impl<S> Iterator for ChainIterator<'_, S>
where
    S: BlockStore + ?Sized,
{
    type Item = Result<Block, ChainError>;

    fn next(&mut self) -> Option<Self::Item> {
        let hash = self.next.take()?;
        match self.fetch(&hash) {
            Ok(block) => {
                tracing::trace!(hash = %hash, genesis = block.is_genesis(), "chain iterator step");
                self.next = block.parent().copied();
                Some(Ok(block))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

impl<S> FusedIterator for ChainIterator<'_, S> where S: BlockStore + ?Sized {}
