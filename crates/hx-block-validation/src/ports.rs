//! Outbound ports for the validation pipeline.

use async_trait::async_trait;
use shared_types::Hash;

/// Index answering "which block on branch X committed transaction Y".
///
/// The branch is identified by its tip hash (a block's previous-hash field
/// when validating that block). Backed by the transaction-block index the
/// execution layer maintains.
#[async_trait]
pub trait TransactionBlockIndex: Send + Sync {
    /// Hash of the block containing `tx_id` on the branch rooted at
    /// `branch`, or `None` when the transaction is not committed there.
    async fn block_containing(&self, tx_id: &Hash, branch: &Hash) -> Option<Hash>;
}

/// Clock abstraction so tests control validation time.
pub trait TimeSource: Send + Sync {
    /// Current Unix time in milliseconds.
    fn now_ms(&self) -> u64;
}

/// Wall-clock time source.
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_ms(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}
