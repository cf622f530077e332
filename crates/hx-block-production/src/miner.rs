//! The block miner.

use crate::config::MinerConfig;
use crate::error::{MinerError, Result};
use crate::ports::{ChainHeadView, ReadyTransactionPool, TransactionExecutor};
use shared_crypto::{merkle_root, NodeKeyPair};
use shared_types::{Block, BlockBody, BlockHeader, ExclusionFlag};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Packages ready transactions into a signed block.
///
/// One production attempt at a time: [`Miner::mine`] fail-fasts with `None`
/// when the shared exclusion flag is held (a block import is in flight, or a
/// previous attempt has not finished). An attempt that runs past 90% of the
/// slot interval is abandoned; the selected transactions stay in the pool
/// either way, since only the commit path removes them.
pub struct Miner<P, E, H> {
    flag: Arc<ExclusionFlag>,
    pool: Arc<P>,
    executor: Arc<E>,
    head: Arc<H>,
    keypair: Arc<NodeKeyPair>,
    config: MinerConfig,
}

impl<P, E, H> Miner<P, E, H>
where
    P: ReadyTransactionPool,
    E: TransactionExecutor,
    H: ChainHeadView,
{
    /// Create a miner sharing `flag` with the block commit path.
    pub fn new(
        flag: Arc<ExclusionFlag>,
        pool: Arc<P>,
        executor: Arc<E>,
        head: Arc<H>,
        keypair: Arc<NodeKeyPair>,
        config: MinerConfig,
    ) -> Self {
        Self {
            flag,
            pool,
            executor,
            head,
            keypair,
            config,
        }
    }

    /// Attempt to produce one block.
    ///
    /// Returns `None` when the exclusion flag is busy, when the pool has
    /// nothing ready, or when the attempt fails or exceeds its deadline.
    /// The flag is released in every exit path.
    pub async fn mine(&self) -> Option<Block> {
        let _guard = match self.flag.try_acquire() {
            Some(guard) => guard,
            None => {
                debug!("[hx-production] Mining skipped: exclusion flag is busy");
                return None;
            }
        };

        let txs = self
            .pool
            .select_ready(self.config.max_transactions_per_block)
            .await;
        if txs.is_empty() {
            debug!("[hx-production] Mining skipped: no ready transactions");
            return None;
        }

        match tokio::time::timeout(self.config.production_deadline(), self.build_block(&txs)).await
        {
            Ok(Ok(block)) => {
                info!(
                    "[hx-production] Mined block {} at height {} ({} txs)",
                    hex::encode(&block.hash()[..8]),
                    block.height(),
                    block.body.transactions_count()
                );
                Some(block)
            }
            Ok(Err(err)) => {
                warn!("[hx-production] Mining attempt failed: {err}");
                None
            }
            Err(_) => {
                warn!(
                    "[hx-production] Mining attempt exceeded deadline ({:?}), abandoning {} txs",
                    self.config.production_deadline(),
                    txs.len()
                );
                None
            }
        }
    }

    async fn build_block(&self, txs: &[shared_types::Transaction]) -> Result<Block> {
        let (head_height, head_hash) = self.head.head().await;
        let executed = self.executor.execute(&head_hash, txs).await?;
        if executed.is_empty() {
            return Err(MinerError::NothingToPackage);
        }

        let mut header = BlockHeader {
            version: self.config.version,
            chain_id: self.config.chain_id,
            height: head_height + 1,
            previous_block_hash: head_hash,
            merkle_root: merkle_root(&executed),
            timestamp_ms: now_ms(),
            producer: self.keypair.public_key(),
            signature: [0u8; 64],
        };
        header.signature = self.keypair.sign(&header.hash());

        Ok(Block {
            header,
            body: BlockBody {
                transaction_ids: executed,
            },
        })
    }
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
