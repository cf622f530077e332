//! The block commit controller.
//!
//! Every block reaches the chain through [`BlockCommitController::execute_and_add_block`],
//! mined and received alike. The shared exclusion flag makes commits and
//! mining mutually exclusive; a busy flag is answered with a fail-fast
//! `Mining` outcome rather than queueing.

use crate::ports::{ChainStore, CommitHook, NodePool, WorldState};
use hx_block_validation::{TransactionBlockIndex, ValidationPipeline};
use parking_lot::RwLock;
use shared_types::{Block, CommitOutcome, ExclusionFlag, Transaction, ValidationCode};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Orchestrates validation, orphan handling, execution, and append.
pub struct BlockCommitController<C, W, P, I> {
    flag: Arc<ExclusionFlag>,
    chain: Arc<C>,
    world: Arc<W>,
    pool: Arc<P>,
    pipeline: Arc<ValidationPipeline<I>>,
    hook: RwLock<Option<Arc<dyn CommitHook>>>,
}

impl<C, W, P, I> BlockCommitController<C, W, P, I>
where
    C: ChainStore,
    W: WorldState,
    P: NodePool,
    I: TransactionBlockIndex,
{
    /// Create a controller sharing `flag` with the miner.
    pub fn new(
        flag: Arc<ExclusionFlag>,
        chain: Arc<C>,
        world: Arc<W>,
        pool: Arc<P>,
        pipeline: Arc<ValidationPipeline<I>>,
    ) -> Self {
        Self {
            flag,
            chain,
            world,
            pool,
            pipeline,
            hook: RwLock::new(None),
        }
    }

    /// Attach the post-commit hook. Wired after construction because the
    /// hook (the consensus engine) is built on top of this controller.
    pub fn set_commit_hook(&self, hook: Arc<dyn CommitHook>) {
        *self.hook.write() = Some(hook);
    }

    /// Validate, execute, and append one block.
    ///
    /// The exclusion flag is held for the whole commit and released before
    /// the post-commit hook runs, so the hook may immediately trigger a
    /// production attempt.
    pub async fn execute_and_add_block(&self, block: &Block) -> CommitOutcome {
        let outcome = self.commit_under_flag(block).await;
        if outcome.applied {
            let hook = self.hook.read().clone();
            if let Some(hook) = hook {
                hook.block_committed().await;
            }
        }
        outcome
    }

    async fn commit_under_flag(&self, block: &Block) -> CommitOutcome {
        let _guard = match self.flag.try_acquire() {
            Some(guard) => guard,
            None => {
                debug!(
                    "[hx-node] Commit of block at height {} deferred: mining in progress",
                    block.height()
                );
                return CommitOutcome::rejected(ValidationCode::Mining);
            }
        };

        let block_hash = block.hash();
        let height = block.height();

        if let Some(local) = self.chain.block_at_height(height).await {
            if local.hash() == block_hash {
                debug!(
                    "[hx-node] Block {} already committed",
                    hex::encode(&block_hash[..8])
                );
                return CommitOutcome::applied();
            }
        }

        if let Err(err) = self.pipeline.validate_before_attach(block) {
            warn!(
                "[hx-node] Block {} rejected structurally: {err}",
                hex::encode(&block_hash[..8])
            );
            return CommitOutcome::rejected(err.code());
        }

        let (head_height, head_hash) = self.chain.head().await;
        if height <= head_height {
            match self.resolve_orphan(block, height).await {
                Ok(()) => {}
                Err(code) => return CommitOutcome::rejected(code),
            }
        } else if height == head_height + 1 {
            if block.header.previous_block_hash != head_hash {
                warn!(
                    "[hx-node] Block {} does not extend head {}",
                    hex::encode(&block_hash[..8]),
                    hex::encode(&head_hash[..8])
                );
                return CommitOutcome::rejected(ValidationCode::OrphanBlock);
            }
        } else {
            warn!(
                "[hx-node] Block at height {height} is ahead of head {head_height}, sync required"
            );
            return CommitOutcome::rejected(ValidationCode::OrphanBlock);
        }

        if let Err(err) = self.pipeline.validate_before_execute(block).await {
            warn!(
                "[hx-node] Block {} rejected before execution: {err}",
                hex::encode(&block_hash[..8])
            );
            return CommitOutcome::rejected(err.code());
        }

        let mut txs: Vec<Transaction> = Vec::with_capacity(block.body.transactions_count());
        for tx_id in &block.body.transaction_ids {
            match self.pool.get(tx_id).await {
                Some(tx) => txs.push(tx),
                None => {
                    warn!(
                        "[hx-node] Transaction {} of block {} not in pool",
                        hex::encode(&tx_id[..8]),
                        hex::encode(&block_hash[..8])
                    );
                    return CommitOutcome::rejected(ValidationCode::ExecutionFailed);
                }
            }
        }

        let executed = match self.world.apply_block(block, &txs).await {
            Ok(executed) => executed,
            Err(err) => {
                warn!(
                    "[hx-node] Execution of block {} failed: {err}",
                    hex::encode(&block_hash[..8])
                );
                return CommitOutcome::rejected(ValidationCode::ExecutionFailed);
            }
        };
        // Diagnostic only; anomalies are logged by the pipeline.
        let _report = self.pipeline.validate_after_execute(block, &executed);

        self.chain.append(block.clone()).await;
        self.pool.remove(&block.body.transaction_ids).await;
        info!(
            "[hx-node] Committed block {} at height {height} ({} txs)",
            hex::encode(&block_hash[..8]),
            block.body.transactions_count()
        );
        CommitOutcome::applied()
    }

    /// Decide what to do with a block that conflicts with a committed
    /// height. The chronologically senior block (older timestamp) wins: the
    /// local branch above `height - 1` is unwound and its transactions
    /// re-pooled. The unwind touches world state, pool, and chain in turn
    /// and is not atomic; a crash mid-way leaves a node that must resync.
    async fn resolve_orphan(&self, block: &Block, height: u64) -> Result<(), ValidationCode> {
        let Some(local) = self.chain.block_at_height(height).await else {
            return Err(ValidationCode::OrphanBlock);
        };
        if block.header.timestamp_ms >= local.header.timestamp_ms {
            debug!(
                "[hx-node] Keeping local block at height {height} (incoming is not older)"
            );
            return Err(ValidationCode::OrphanBlock);
        }

        info!(
            "[hx-node] Incoming block at height {height} predates local {}, rolling back",
            hex::encode(&local.hash()[..8])
        );
        let invalidated = self.world.rollback_to_height(height - 1).await;
        let count = invalidated.len();
        self.pool.return_transactions(invalidated).await;
        self.chain.truncate_above(height - 1).await;
        self.world
            .set_branch_tip(block.header.previous_block_hash)
            .await;
        info!(
            "[hx-node] Rolled back to height {} ({count} txs re-pooled)",
            height - 1
        );
        Ok(())
    }
}
