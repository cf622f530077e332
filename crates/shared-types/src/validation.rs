//! # Commit Result Codes
//!
//! The outward-observable outcome of a block commit attempt. `Mining` is the
//! fail-fast answer when the exclusion token is busy; `OrphanBlock` is
//! recoverable via rollback when the incoming block is chronologically
//! senior; the rest are terminal structural failures.

use serde::{Deserialize, Serialize};

/// Result code of a commit or validation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationCode {
    /// The block passed validation (and, for commits, was applied).
    Success,
    /// Mining or another block import holds the exclusion token; retry later.
    Mining,
    /// Block conflicts with the local chain at the same height.
    OrphanBlock,
    /// Block body packages no transactions.
    EmptyBody,
    /// Block body packages the same transaction id twice.
    DuplicateTransaction,
    /// Block belongs to a different chain.
    ChainIdMismatch,
    /// Producer signature missing or invalid.
    InvalidSignature,
    /// Body merkle root does not match the header's declared root.
    MerkleRootMismatch,
    /// Block timestamp lies beyond the configured future tolerance.
    FutureBlockTime,
    /// A packaged transaction is already committed on this branch.
    RepackagedTransaction,
    /// The execution engine failed to apply the block.
    ExecutionFailed,
}

impl ValidationCode {
    /// Whether a commit attempt with this code may be retried by the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Mining)
    }
}

/// Outcome of `execute_and_add_block`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitOutcome {
    /// Whether the block was executed and appended to the local chain.
    pub applied: bool,
    /// The result code; `Success` when applied.
    pub code: ValidationCode,
}

impl CommitOutcome {
    /// A successful, applied commit.
    pub fn applied() -> Self {
        Self {
            applied: true,
            code: ValidationCode::Success,
        }
    }

    /// A rejected commit with the given code.
    pub fn rejected(code: ValidationCode) -> Self {
        Self {
            applied: false,
            code,
        }
    }
}
