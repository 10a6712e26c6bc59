//! Persistent chain store.
//!
//! [`Blockchain`] wires together:
//!
//! - a [`BlockStore`] holding every block and the tip pointer,
//! - a [`Miner`] that seals new blocks off the async executor,
//! - a [`MetricsRegistry`] updated on every append.
//!
//! The store is the only representation of the chain. Nothing is cached
//! in memory: the tip is re-read for every operation and history is
//! rebuilt on demand through [`ChainIterator`].

pub mod iter;

pub use iter::ChainIterator;

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::ChainConfig;
use crate::error::ChainError;
use crate::metrics::MetricsRegistry;
use crate::pow::{CancelFlag, Miner, ProofOfWork};
use crate::storage::{BlockStore, SledBlockStore};
use crate::types::{Block, BlockHash, BlockTemplate};

/// Summary returned by [`Blockchain::verify`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainReport {
    /// Blocks on the chain, genesis included.
    pub blocks: usize,
    pub tip: BlockHash,
}

/// Append-only chain of proof-of-work blocks over a [`BlockStore`].
///
/// Reads take `&self` and may run concurrently. Appends are serialized
/// by an internal lock held from reading the tip until the new block is
/// committed, so two appends can never mine on the same parent.
pub struct Blockchain<S> {
    store: S,
    miner: Miner,
    append_lock: Mutex<()>,
    metrics: Arc<MetricsRegistry>,
}

impl Blockchain<SledBlockStore> {
    /// Opens the sled store described by `cfg` and bootstraps it if
    /// needed.
    pub async fn open_with_config(cfg: &ChainConfig) -> Result<Self, ChainError> {
        let pow = cfg
            .pow
            .build()
            .map_err(|e| ChainError::Config(e.to_string()))?;
        let store = SledBlockStore::open(&cfg.storage).map_err(ChainError::StorageOpen)?;
        Self::open(store, pow).await
    }
}

impl<S> Blockchain<S>
where
    S: BlockStore,
{
    /// Opens a chain over `store` with a private metrics registry.
    pub async fn open(store: S, pow: ProofOfWork) -> Result<Self, ChainError> {
        let metrics = MetricsRegistry::new()
            .map_err(|e| ChainError::Config(format!("failed to initialise metrics: {e}")))?;
        Self::open_with_metrics(store, pow, Arc::new(metrics)).await
    }

    /// Opens a chain over `store`.
    ///
    /// On an empty store this mines a genesis block and writes it
    /// together with the tip in one transaction. On an existing store it
    /// checks that the tip resolves to a stored block.
    pub async fn open_with_metrics(
        store: S,
        pow: ProofOfWork,
        metrics: Arc<MetricsRegistry>,
    ) -> Result<Self, ChainError> {
        let miner = Miner::new(pow);

        match store.tip()? {
            Some(tip) => {
                if store.get_block(&tip)?.is_none() {
                    return Err(ChainError::Integrity(format!(
                        "tip {tip} does not resolve to a stored block"
                    )));
                }
                tracing::info!(tip = %tip, "opened existing chain");
            }
            None => {
                if store.has_entries()? {
                    return Err(ChainError::Integrity(
                        "namespace holds entries but no tip".to_string(),
                    ));
                }
                let genesis = miner
                    .mine(BlockTemplate::genesis(), CancelFlag::new())
                    .await?
                    .block;
                store.initialize(&genesis)?;
                tracing::info!(hash = %genesis.hash(), "created genesis block");
            }
        }

        Ok(Self {
            store,
            miner,
            append_lock: Mutex::new(()),
            metrics,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn pow(&self) -> &ProofOfWork {
        self.miner.pow()
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Hash of the most recently appended block.
    pub fn tip(&self) -> Result<BlockHash, ChainError> {
        self.store
            .tip()?
            .ok_or_else(|| ChainError::Integrity("tip key missing".to_string()))
    }

    pub fn get_block(&self, hash: &BlockHash) -> Result<Option<Block>, ChainError> {
        Ok(self.store.get_block(hash)?)
    }

    /// Mines a block carrying `payload` on top of the current tip and
    /// commits it.
    pub async fn append(&self, payload: impl Into<String>) -> Result<Block, ChainError> {
        self.append_with_cancel(payload, CancelFlag::new()).await
    }

    /// Like [`Blockchain::append`], but the proof-of-work search stops
    /// with [`crate::pow::PowError::Cancelled`] once `cancel` is set.
    /// Nothing is written in that case.
    pub async fn append_with_cancel(
        &self,
        payload: impl Into<String>,
        cancel: CancelFlag,
    ) -> Result<Block, ChainError> {
        let result = self.try_append(payload.into(), cancel).await;
        if let Err(e) = &result {
            self.metrics.chain.append_failures.inc();
            tracing::warn!(error = %e, "append failed, chain unchanged");
        }
        result
    }

    async fn try_append(&self, payload: String, cancel: CancelFlag) -> Result<Block, ChainError> {
        let _guard = self.append_lock.lock().await;

        let parent = self.tip()?;
        let mined = self
            .miner
            .mine(BlockTemplate::new(payload, Some(parent)), cancel)
            .await?;
        self.store.commit_block(&mined.block, &parent)?;

        let chain = &self.metrics.chain;
        chain.blocks_appended.inc();
        chain.hash_attempts.inc_by(mined.attempts);
        chain.mining_seconds.observe(mined.elapsed_secs);

        tracing::info!(hash = %mined.block.hash(), parent = %parent, "appended block");
        Ok(mined.block)
    }

    /// Fresh newest-to-oldest traversal starting at the current tip.
    pub fn iter(&self) -> Result<ChainIterator<'_, S>, ChainError> {
        Ok(ChainIterator::new(&self.store, *self.pow(), self.tip()?))
    }

    /// Number of blocks on the chain, genesis included.
    pub fn height(&self) -> Result<usize, ChainError> {
        let mut count = 0;
        for block in self.iter()? {
            block?;
            count += 1;
        }
        Ok(count)
    }

    /// Walks the whole chain and checks every block's proof-of-work.
    ///
    /// Linkage is checked by the traversal itself: each step looks up the
    /// previous block's parent hash and rejects entries whose hash does
    /// not match the key they were found under or their own digest.
    pub fn verify(&self) -> Result<ChainReport, ChainError> {
        let tip = self.tip()?;
        let pow = self.pow();
        let mut blocks = 0;

        for block in ChainIterator::new(&self.store, *pow, tip) {
            let block = block?;
            if !pow.validate(&block) {
                return Err(ChainError::Integrity(format!(
                    "block {} fails proof-of-work",
                    block.hash()
                )));
            }
            blocks += 1;
        }
        Ok(ChainReport { blocks, tip })
    }

    /// Flushes and releases the store.
    pub fn close(self) -> Result<(), ChainError> {
        self.store.flush().map_err(ChainError::Transaction)?;
        tracing::debug!("chain store closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_block;
    use crate::config::PowConfig;
    use crate::pow::PowError;
    use crate::storage::{InMemoryBlockStore, SledConfig, TIP_KEY};
    use crate::types::{GENESIS_PAYLOAD, Hash256};
    use tempfile::TempDir;

    const TEST_BITS: u32 = 8;

    fn pow() -> ProofOfWork {
        ProofOfWork::new(TEST_BITS).expect("valid bits")
    }

    async fn mem_chain() -> Blockchain<InMemoryBlockStore> {
        Blockchain::open(InMemoryBlockStore::new(), pow())
            .await
            .expect("open chain")
    }

    fn sled_config(tmp: &TempDir) -> ChainConfig {
        ChainConfig {
            storage: SledConfig {
                path: tmp.path().join("blockchain.db").to_string_lossy().to_string(),
                namespace: "blocks".to_string(),
            },
            pow: PowConfig {
                target_bits: TEST_BITS,
            },
        }
    }

    fn collect<S: BlockStore>(chain: &Blockchain<S>) -> Vec<Block> {
        chain
            .iter()
            .expect("iter")
            .collect::<Result<Vec<_>, _>>()
            .expect("walk chain")
    }

    #[tokio::test]
    async fn fresh_store_holds_only_genesis() {
        let chain = mem_chain().await;
        let blocks = collect(&chain);

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].payload(), GENESIS_PAYLOAD);
        assert_eq!(blocks[0].parent_hex(), "");
        assert_eq!(chain.tip().expect("tip"), *blocks[0].hash());
    }

    #[tokio::test]
    async fn n_appends_yield_n_plus_one_blocks_newest_first() {
        let chain = mem_chain().await;
        for i in 0..5 {
            chain.append(format!("entry {i}")).await.expect("append");
        }

        let blocks = collect(&chain);
        assert_eq!(blocks.len(), 6);
        for (i, block) in blocks.iter().take(5).enumerate() {
            assert_eq!(block.payload(), format!("entry {}", 4 - i));
        }
        assert!(blocks[5].is_genesis());
        for pair in blocks.windows(2) {
            assert_eq!(pair[0].parent(), Some(pair[1].hash()));
        }
        assert_eq!(chain.height().expect("height"), 6);
    }

    #[tokio::test]
    async fn append_moves_tip_onto_new_block() {
        let chain = mem_chain().await;
        let before = chain.tip().expect("tip");

        let block = chain.append("send 1 unit to A").await.expect("append");

        let tip = chain.tip().expect("tip");
        assert_eq!(tip, *block.hash());
        let stored = chain.get_block(&tip).expect("get").expect("stored");
        assert_eq!(stored.payload(), "send 1 unit to A");
        assert_eq!(stored.parent(), Some(&before));
        assert!(chain.pow().validate(&stored));
    }

    #[tokio::test]
    async fn failed_commit_leaves_store_unchanged() {
        let chain = mem_chain().await;
        chain.append("kept").await.expect("append");
        let tip_before = chain.tip().expect("tip");
        let entries_before = chain.store().snapshot();

        chain.store().set_fail_commits(true);
        let err = chain.append("lost").await;

        assert!(matches!(err, Err(ChainError::Transaction(_))));
        assert_eq!(chain.tip().expect("tip"), tip_before);
        assert_eq!(chain.store().snapshot(), entries_before);
        assert_eq!(chain.metrics().chain.append_failures.get(), 1);

        chain.store().set_fail_commits(false);
        chain.append("after recovery").await.expect("append");
        assert_eq!(chain.height().expect("height"), 3);
    }

    #[tokio::test]
    async fn cancelled_append_writes_nothing() {
        let chain = mem_chain().await;
        let entries_before = chain.store().snapshot();

        let cancel = CancelFlag::new();
        cancel.cancel();
        let err = chain.append_with_cancel("never", cancel).await;

        assert!(matches!(err, Err(ChainError::Mining(PowError::Cancelled))));
        assert_eq!(chain.store().snapshot(), entries_before);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_appends_form_a_single_line() {
        let chain = Arc::new(mem_chain().await);

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let chain = chain.clone();
                tokio::spawn(async move { chain.append(format!("writer {i}")).await })
            })
            .collect();
        for handle in handles {
            handle.await.expect("join").expect("append");
        }

        let blocks = collect(&chain);
        assert_eq!(blocks.len(), 5);
        for pair in blocks.windows(2) {
            assert_eq!(pair[0].parent(), Some(pair[1].hash()));
        }
        assert_eq!(chain.metrics().chain.blocks_appended.get(), 4);
    }

    #[tokio::test]
    async fn missing_tip_with_entries_is_an_integrity_error() {
        let store = InMemoryBlockStore::new();
        let genesis = Block::genesis(&pow()).expect("mine");
        store.initialize(&genesis).expect("initialize");
        store.remove_raw(TIP_KEY);

        let err = Blockchain::open(store, pow()).await;
        assert!(matches!(err, Err(ChainError::Integrity(_))));
    }

    #[tokio::test]
    async fn dangling_tip_is_an_integrity_error() {
        let store = InMemoryBlockStore::new();
        let dangling = BlockHash(Hash256::compute(b"nowhere"));
        store.insert_raw(TIP_KEY.to_vec(), dangling.to_hex());

        let err = Blockchain::open(store, pow()).await;
        assert!(matches!(err, Err(ChainError::Integrity(_))));
    }

    #[tokio::test]
    async fn verify_accepts_mined_chain_and_rejects_forged_block() {
        let chain = mem_chain().await;
        chain.append("a").await.expect("append");
        chain.append("b").await.expect("append");

        let report = chain.verify().expect("verify");
        assert_eq!(report.blocks, 3);
        assert_eq!(report.tip, chain.tip().expect("tip"));

        // Forge a block whose hash was never mined and point the tip at it.
        let parent = chain.tip().expect("tip");
        let template = BlockTemplate::new("forged", Some(parent));
        let forged = Block::seal(template, 0, BlockHash(Hash256::compute(b"forged")));
        let store = chain.store();
        store.insert_raw(forged.hash().to_hex(), encode_block(&forged).expect("encode"));
        store.insert_raw(TIP_KEY.to_vec(), forged.hash().to_hex());

        assert!(matches!(chain.verify(), Err(ChainError::Integrity(_))));
    }

    #[tokio::test]
    async fn end_to_end_on_sled() {
        let tmp = TempDir::new().expect("create temp dir");
        let cfg = sled_config(&tmp);

        let chain = Blockchain::open_with_config(&cfg).await.expect("open chain");
        let blocks = collect(&chain);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].payload(), "Genesis Block");

        chain.append("send 1 unit to A").await.expect("append");
        chain.append("send 2 units to B").await.expect("append");

        let blocks = collect(&chain);
        let payloads: Vec<_> = blocks.iter().map(|b| b.payload()).collect();
        assert_eq!(
            payloads,
            ["send 2 units to B", "send 1 unit to A", "Genesis Block"]
        );
        for block in &blocks {
            assert!(chain.pow().validate(block));
        }
        for pair in blocks.windows(2) {
            assert_eq!(pair[0].parent_hex(), pair[1].hash().to_hex());
        }

        chain.close().expect("close");
    }

    #[tokio::test]
    async fn reopening_keeps_chain_and_does_not_mine_new_genesis() {
        let tmp = TempDir::new().expect("create temp dir");
        let cfg = sled_config(&tmp);

        let (genesis, tip) = {
            let chain = Blockchain::open_with_config(&cfg).await.expect("open chain");
            let genesis = chain.tip().expect("tip");
            let block = chain.append("persisted").await.expect("append");
            chain.close().expect("close");
            (genesis, *block.hash())
        };

        let chain = Blockchain::open_with_config(&cfg).await.expect("reopen chain");
        assert_eq!(chain.tip().expect("tip"), tip);
        let blocks = collect(&chain);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].hash(), &genesis);
        chain.close().expect("close");
    }

    #[tokio::test]
    async fn second_open_of_locked_store_fails_with_storage_open() {
        let tmp = TempDir::new().expect("create temp dir");
        let cfg = sled_config(&tmp);

        let first = Blockchain::open_with_config(&cfg).await.expect("open chain");
        let second = Blockchain::open_with_config(&cfg).await;
        assert!(matches!(second, Err(ChainError::StorageOpen(_))));

        assert_eq!(first.height().expect("height"), 1);
        first.close().expect("close");
    }

    #[tokio::test]
    async fn invalid_target_bits_fail_before_touching_disk() {
        let tmp = TempDir::new().expect("create temp dir");
        let mut cfg = sled_config(&tmp);
        cfg.pow.target_bits = 0;

        let err = Blockchain::open_with_config(&cfg).await;
        assert!(matches!(err, Err(ChainError::Config(_))));
        assert!(!tmp.path().join("blockchain.db").exists());
    }
}
