//! Glue between the consensus engine's ports and the node runtime.

use crate::adapters::in_memory::{
    DryRunExecutor, InMemoryChainStore, InMemoryPool, InMemoryWorldState,
};
use crate::adapters::network::ChannelNetwork;
use crate::controller::BlockCommitController;
use crate::ports::{CommitHook, NetworkPort, NodePool};
use async_trait::async_trait;
use hx_block_production::Miner;
use hx_consensus::ports::{BlockProductionPort, TransactionPoolPort};
use hx_consensus::ConsensusEngine;
use shared_types::{Address, Hash, NetworkMessage, Transaction};
use std::sync::Arc;
use tracing::warn;

/// The miner as wired in this runtime.
pub type NodeMiner = Miner<InMemoryPool, DryRunExecutor, InMemoryChainStore>;

/// The commit controller as wired in this runtime.
pub type NodeController =
    BlockCommitController<InMemoryChainStore, InMemoryWorldState, InMemoryPool, InMemoryWorldState>;

/// The consensus engine as wired in this runtime.
pub type NodeEngine =
    ConsensusEngine<ConsensusPoolAdapter, InMemoryWorldState, ProductionAdapter, InMemoryWorldState>;

/// Pool port for the engine: local insert plus gossip.
pub struct ConsensusPoolAdapter {
    pool: Arc<InMemoryPool>,
    network: Arc<ChannelNetwork>,
}

impl ConsensusPoolAdapter {
    /// Wrap the pool and network.
    pub fn new(pool: Arc<InMemoryPool>, network: Arc<ChannelNetwork>) -> Self {
        Self { pool, network }
    }
}

#[async_trait]
impl TransactionPoolPort for ConsensusPoolAdapter {
    async fn submit(&self, tx: Transaction) -> bool {
        let inserted = self.pool.insert(tx.clone()).await;
        if inserted {
            match bincode::serialize(&tx) {
                Ok(bytes) => self.network.broadcast(NetworkMessage::Tx { bytes }).await,
                Err(err) => warn!("[hx-node] Failed to encode transaction for gossip: {err}"),
            }
        }
        inserted
    }

    async fn next_sequence(&self, account: &Address) -> Option<u64> {
        self.pool.next_sequence_for(account)
    }

    async fn pending_count(&self) -> usize {
        self.pool.len()
    }
}

/// Production port for the engine: mine, commit, broadcast.
pub struct ProductionAdapter {
    miner: Arc<NodeMiner>,
    controller: Arc<NodeController>,
    network: Arc<ChannelNetwork>,
}

impl ProductionAdapter {
    /// Wrap the miner, controller, and network.
    pub fn new(
        miner: Arc<NodeMiner>,
        controller: Arc<NodeController>,
        network: Arc<ChannelNetwork>,
    ) -> Self {
        Self {
            miner,
            controller,
            network,
        }
    }
}

#[async_trait]
impl BlockProductionPort for ProductionAdapter {
    async fn produce_and_commit(&self) -> Option<Hash> {
        let block = self.miner.mine().await?;
        let bytes = match bincode::serialize(&block) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("[hx-node] Failed to encode block for broadcast: {err}");
                return None;
            }
        };
        let outcome = self.controller.execute_and_add_block(&block).await;
        if !outcome.applied {
            warn!(
                "[hx-node] Own block {} rejected by commit pipeline: {:?}",
                hex::encode(&block.hash()[..8]),
                outcome.code
            );
            return None;
        }
        // The commit hook's schedule rebuild can abort the slot-timer task
        // running this attempt, so the broadcast gets its own task instead
        // of an await that cancellation could cut short.
        let network = Arc::clone(&self.network);
        tokio::spawn(async move {
            network.broadcast(NetworkMessage::Block { bytes }).await;
        });
        Some(block.hash())
    }
}

/// Post-commit hook driving the engine's schedule re-evaluation.
///
/// Re-evaluation is spawned rather than awaited: the committed block may
/// have advanced the round, and the rebuild cancels timers that could
/// include the very task running this hook.
pub struct EngineCommitHook {
    engine: Arc<NodeEngine>,
}

impl EngineCommitHook {
    /// Wrap the engine.
    pub fn new(engine: Arc<NodeEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl CommitHook for EngineCommitHook {
    async fn block_committed(&self) {
        let engine = Arc::clone(&self.engine);
        tokio::spawn(async move {
            engine.reevaluate().await;
        });
    }
}
