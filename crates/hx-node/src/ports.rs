//! Outbound ports for the node runtime.

use async_trait::async_trait;
use hx_block_production::ExecutionError;
use shared_types::{Block, Hash, NetworkMessage, NodeId, Transaction};

/// Append-only view of the local chain.
#[async_trait]
pub trait ChainStore: Send + Sync {
    /// Height and hash of the current best block. `(0, zero-hash)` before
    /// the first block.
    async fn head(&self) -> (u64, Hash);

    /// The block at `height` on the local chain, if present.
    async fn block_at_height(&self, height: u64) -> Option<Block>;

    /// Append a block at the tip.
    async fn append(&self, block: Block);

    /// Drop all blocks above `height`; returns them newest-first.
    async fn truncate_above(&self, height: u64) -> Vec<Block>;
}

/// Mutable world state: execution, indices, and rollback.
#[async_trait]
pub trait WorldState: Send + Sync {
    /// Execute a block's transactions against current state: update the
    /// transaction-block index, account sequences, and (for consensus
    /// transactions) round state. Returns the ids of applied transactions.
    async fn apply_block(
        &self,
        block: &Block,
        txs: &[Transaction],
    ) -> std::result::Result<Vec<Hash>, ExecutionError>;

    /// Undo every block above `height`; returns the transactions those
    /// blocks had committed, for re-pooling.
    async fn rollback_to_height(&self, height: u64) -> Vec<Transaction>;

    /// Look up an already-committed transaction by id. Backs transaction
    /// requests for ids that have left the pool.
    async fn committed_transaction(&self, id: &Hash) -> Option<Transaction>;

    /// Repoint the execution cursor at a new branch tip.
    async fn set_branch_tip(&self, hash: Hash);
}

/// The node-side transaction pool surface.
#[async_trait]
pub trait NodePool: Send + Sync {
    /// Insert a transaction. Returns `false` for duplicates.
    async fn insert(&self, tx: Transaction) -> bool;

    /// Look up a pending transaction by id.
    async fn get(&self, id: &Hash) -> Option<Transaction>;

    /// Remove committed transactions.
    async fn remove(&self, ids: &[Hash]);

    /// Re-pool transactions invalidated by a rollback.
    async fn return_transactions(&self, txs: Vec<Transaction>);
}

/// Outbound network surface.
#[async_trait]
pub trait NetworkPort: Send + Sync {
    /// Send to every connected peer.
    async fn broadcast(&self, message: NetworkMessage);

    /// Send to one peer. Unknown peers are a silent drop.
    async fn send_to(&self, peer: &NodeId, message: NetworkMessage);
}

/// Notification that a block was committed. The consensus engine hangs its
/// schedule re-evaluation off this.
#[async_trait]
pub trait CommitHook: Send + Sync {
    /// Called after each applied block, outside the exclusion flag.
    async fn block_committed(&self);
}
