//! The node's message loop and outward surface.
//!
//! One consumer drains the bounded inbound queue; a malformed or failing
//! message is logged and dropped, never allowed to stop the loop.
//!
//! Blocks referencing transactions this node has never seen are parked
//! while the transactions are requested from the sender; blocks ahead of
//! the local head start a catch-up walk of `RequestBlock` messages.

use crate::controller::BlockCommitController;
use crate::error::Result;
use crate::ports::{ChainStore, NetworkPort, NodePool, WorldState};
use hx_block_validation::TransactionBlockIndex;
use shared_types::{Block, Hash, InboundEnvelope, NetworkMessage, NodeId, Transaction};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Bound on blocks waiting for their transactions or for a chain gap.
const MAX_PARKED_BLOCKS: usize = 64;

/// Single-consumer loop over the inbound message queue.
pub struct NodeService<C, W, P, I, N> {
    controller: Arc<BlockCommitController<C, W, P, I>>,
    chain: Arc<C>,
    world: Arc<W>,
    pool: Arc<P>,
    network: Arc<N>,
    inbound: mpsc::Receiver<InboundEnvelope>,
    /// Blocks that cannot be committed yet, with the peer that sent them.
    parked: Vec<(NodeId, Block)>,
    /// Highest height seen ahead of the local head; zero when caught up.
    sync_target: u64,
}

impl<C, W, P, I, N> NodeService<C, W, P, I, N>
where
    C: ChainStore,
    W: WorldState,
    P: NodePool,
    I: TransactionBlockIndex,
    N: NetworkPort,
{
    /// Create the service over its stores and the inbound queue.
    pub fn new(
        controller: Arc<BlockCommitController<C, W, P, I>>,
        chain: Arc<C>,
        world: Arc<W>,
        pool: Arc<P>,
        network: Arc<N>,
        inbound: mpsc::Receiver<InboundEnvelope>,
    ) -> Self {
        Self {
            controller,
            chain,
            world,
            pool,
            network,
            inbound,
            parked: Vec::new(),
            sync_target: 0,
        }
    }

    /// Drain the inbound queue until every sender is dropped.
    pub async fn run(mut self) {
        info!("[hx-node] Message loop started");
        while let Some(envelope) = self.inbound.recv().await {
            self.dispatch(envelope).await;
        }
        info!("[hx-node] Inbound queue closed, message loop exiting");
    }

    async fn dispatch(&mut self, envelope: InboundEnvelope) {
        let peer = envelope.peer;
        match envelope.message {
            NetworkMessage::RequestBlock { height } => self.answer_block_request(peer, height).await,
            NetworkMessage::TxRequest { tx_hash } => self.answer_tx_request(peer, tx_hash).await,
            NetworkMessage::Block { bytes } => self.handle_block(peer, &bytes).await,
            NetworkMessage::Tx { bytes } => self.handle_tx(&bytes).await,
        }
    }

    /// Unknown heights are a silent drop; the requester retries elsewhere.
    async fn answer_block_request(&self, peer: NodeId, height: u64) {
        let Some(block) = self.chain.block_at_height(height).await else {
            debug!("[hx-node] No block at height {height} for peer request");
            return;
        };
        match bincode::serialize(&block) {
            Ok(bytes) => {
                self.network
                    .send_to(&peer, NetworkMessage::Block { bytes })
                    .await
            }
            Err(err) => warn!("[hx-node] Failed to encode block {height}: {err}"),
        }
    }

    /// Answered from the pool, then from committed state. Transactions
    /// unknown to both are a silent drop.
    async fn answer_tx_request(&self, peer: NodeId, tx_hash: Hash) {
        let tx = match self.pool.get(&tx_hash).await {
            Some(tx) => tx,
            None => match self.world.committed_transaction(&tx_hash).await {
                Some(tx) => tx,
                None => return,
            },
        };
        match bincode::serialize(&tx) {
            Ok(bytes) => self.network.send_to(&peer, NetworkMessage::Tx { bytes }).await,
            Err(err) => warn!("[hx-node] Failed to encode transaction: {err}"),
        }
    }

    async fn handle_block(&mut self, peer: NodeId, bytes: &[u8]) {
        let block: Block = match bincode::deserialize(bytes) {
            Ok(block) => block,
            Err(err) => {
                warn!("[hx-node] Dropping undecodable block from peer: {err}");
                return;
            }
        };
        self.ingest(peer, block).await;
    }

    async fn handle_tx(&mut self, bytes: &[u8]) {
        let tx: Transaction = match bincode::deserialize(bytes) {
            Ok(tx) => tx,
            Err(err) => {
                warn!("[hx-node] Dropping undecodable transaction from peer: {err}");
                return;
            }
        };
        if self.pool.insert(tx.clone()).await {
            debug!("[hx-node] Pooled transaction {} from peer", tx.short_id());
            // A parked block may have been waiting on exactly this arrival.
            if let Some((peer, block)) = self.take_ready().await {
                self.ingest(peer, block).await;
            }
        }
    }

    /// Feed a block through the commit pipeline, then drain any parked
    /// blocks that the new head makes attachable.
    async fn ingest(&mut self, peer: NodeId, block: Block) {
        let mut next = Some((peer, block));
        while let Some((peer, block)) = next.take() {
            self.try_commit(peer, block).await;
            next = self.take_ready().await;
        }
    }

    async fn try_commit(&mut self, peer: NodeId, block: Block) {
        let height = block.height();
        let (head_height, _) = self.chain.head().await;

        // A gap means we are behind; park the block and walk the gap from
        // the first attachable height.
        if height > head_height + 1 {
            self.sync_target = self.sync_target.max(height);
            debug!(
                "[hx-node] Block at height {height} is ahead of head {head_height}, catching up"
            );
            self.park(peer, block);
            self.network
                .send_to(
                    &peer,
                    NetworkMessage::RequestBlock {
                        height: head_height + 1,
                    },
                )
                .await;
            return;
        }

        // The commit path resolves transactions from the pool; fetch the
        // ones we have never seen before trying.
        let missing = self.missing_transactions(&block).await;
        if !missing.is_empty() {
            debug!(
                "[hx-node] Block at height {height} references {} unknown transactions, requesting",
                missing.len()
            );
            self.park(peer, block);
            for tx_hash in missing {
                self.network
                    .send_to(&peer, NetworkMessage::TxRequest { tx_hash })
                    .await;
            }
            return;
        }

        let outcome = self.controller.execute_and_add_block(&block).await;
        if outcome.applied {
            self.continue_catch_up(peer).await;
            return;
        }
        if outcome.code.is_retryable() {
            debug!("[hx-node] Block at height {height} deferred while mining");
        } else {
            debug!(
                "[hx-node] Block at height {height} rejected: {:?}",
                outcome.code
            );
        }
    }

    /// While behind a sync target, keep requesting the next height after
    /// every applied block.
    async fn continue_catch_up(&mut self, peer: NodeId) {
        if self.sync_target == 0 {
            return;
        }
        let (head_height, _) = self.chain.head().await;
        if head_height >= self.sync_target {
            info!("[hx-node] Caught up to height {head_height}");
            self.sync_target = 0;
            return;
        }
        self.network
            .send_to(
                &peer,
                NetworkMessage::RequestBlock {
                    height: head_height + 1,
                },
            )
            .await;
    }

    /// Body ids resolvable neither from the pool nor from committed state.
    async fn missing_transactions(&self, block: &Block) -> Vec<Hash> {
        let mut missing = Vec::new();
        for id in &block.body.transaction_ids {
            if self.pool.get(id).await.is_none()
                && self.world.committed_transaction(id).await.is_none()
            {
                missing.push(*id);
            }
        }
        missing
    }

    fn park(&mut self, peer: NodeId, block: Block) {
        let hash = block.hash();
        if self.parked.iter().any(|(_, parked)| parked.hash() == hash) {
            return;
        }
        if self.parked.len() >= MAX_PARKED_BLOCKS {
            self.parked.remove(0);
        }
        self.parked.push((peer, block));
    }

    /// A parked block that is attachable now: at or below `head + 1`, with
    /// every transaction resolvable.
    async fn take_ready(&mut self) -> Option<(NodeId, Block)> {
        let (head_height, _) = self.chain.head().await;
        for index in 0..self.parked.len() {
            let block = &self.parked[index].1;
            if block.height() <= head_height + 1
                && self.missing_transactions(block).await.is_empty()
            {
                return Some(self.parked.remove(index));
            }
        }
        None
    }
}

/// Outward node surface, independent of the message loop's lifetime.
pub struct NodeHandle<C, P, N> {
    chain: Arc<C>,
    pool: Arc<P>,
    network: Arc<N>,
}

impl<C, P, N> NodeHandle<C, P, N>
where
    C: ChainStore,
    P: NodePool,
    N: NetworkPort,
{
    /// Create a handle over the shared stores.
    pub fn new(chain: Arc<C>, pool: Arc<P>, network: Arc<N>) -> Self {
        Self {
            chain,
            pool,
            network,
        }
    }

    /// Admit a transaction locally and gossip it. `Ok(false)` for a
    /// duplicate (which is not gossiped again).
    pub async fn broadcast_transaction(&self, tx: Transaction) -> Result<bool> {
        if !self.pool.insert(tx.clone()).await {
            debug!("[hx-node] Duplicate transaction {}, not rebroadcast", tx.short_id());
            return Ok(false);
        }
        let bytes = bincode::serialize(&tx)?;
        self.network.broadcast(NetworkMessage::Tx { bytes }).await;
        Ok(true)
    }

    /// Look up a pending transaction.
    pub async fn get_transaction(&self, id: &Hash) -> Option<Transaction> {
        self.pool.get(id).await
    }

    /// Look up a committed block by height.
    pub async fn get_block_at_height(&self, height: u64) -> Option<Block> {
        self.chain.block_at_height(height).await
    }

    /// Height and hash of the local chain head.
    pub async fn head(&self) -> (u64, Hash) {
        self.chain.head().await
    }
}
