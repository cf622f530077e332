//! Outbound ports for the consensus engine.

use async_trait::async_trait;
use shared_types::{Address, Hash, Round, Transaction};

/// The engine's view of the transaction pool.
#[async_trait]
pub trait TransactionPoolPort: Send + Sync {
    /// Insert a consensus transaction locally and gossip it to peers.
    /// Returns `false` when the pool rejected it (duplicate, full).
    async fn submit(&self, tx: Transaction) -> bool;

    /// The next sequence number implied by this account's pooled
    /// transactions, `None` when the pool holds none for the account.
    async fn next_sequence(&self, account: &Address) -> Option<u64>;

    /// Number of transactions currently pending.
    async fn pending_count(&self) -> usize;
}

/// Read access to persisted per-account sequence state.
#[async_trait]
pub trait AccountStateView: Send + Sync {
    /// The next sequence number recorded in committed state for `account`.
    async fn persisted_sequence(&self, account: &Address) -> u64;
}

/// Hands a production request to the mining/commit path.
///
/// Implementations mine a block, run it through the commit pipeline, and
/// broadcast it. `None` means no block was produced this attempt (exclusion
/// flag busy, nothing to package, or the attempt failed).
#[async_trait]
pub trait BlockProductionPort: Send + Sync {
    /// Produce and commit one block; returns its hash on success.
    async fn produce_and_commit(&self) -> Option<Hash>;
}

/// Read access to committed round state.
#[async_trait]
pub trait RoundStore: Send + Sync {
    /// The round the chain is currently in, if any. Initialization stores
    /// two rounds but the chain starts in the first of them.
    async fn current_round(&self) -> Option<Round>;

    /// A specific round by number.
    async fn round(&self, number: u64) -> Option<Round>;
}
