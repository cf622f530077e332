//! Outbound ports for the miner.

use async_trait::async_trait;
use shared_types::{Hash, Transaction};
use thiserror::Error;

/// Failure reported by the execution engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Execution failed on parent {parent}: {reason}", parent = hex::encode(&.parent[..8]))]
pub struct ExecutionError {
    /// Hash of the parent block execution was attempted on.
    pub parent: Hash,
    /// Engine-specific failure description.
    pub reason: String,
}

/// The slice of the transaction pool the miner draws from.
///
/// Selection does not remove: packaged transactions stay pooled until the
/// commit path removes them, so a failed or abandoned attempt needs no
/// compensation.
#[async_trait]
pub trait ReadyTransactionPool: Send + Sync {
    /// Up to `limit` executable transactions, in pool order.
    async fn select_ready(&self, limit: usize) -> Vec<Transaction>;
}

/// Executes a candidate transaction set against the state at `parent`.
#[async_trait]
pub trait TransactionExecutor: Send + Sync {
    /// Execute `txs` on the state rooted at `parent`; returns the ids of
    /// the transactions that were applied, in execution order.
    async fn execute(
        &self,
        parent: &Hash,
        txs: &[Transaction],
    ) -> std::result::Result<Vec<Hash>, ExecutionError>;
}

/// Read access to the local chain head.
#[async_trait]
pub trait ChainHeadView: Send + Sync {
    /// Height and hash of the current best block.
    async fn head(&self) -> (u64, Hash);
}
