//! Error types for block validation.

use shared_types::{Hash, ValidationCode};
use thiserror::Error;

/// Result type alias for validation operations.
pub type Result<T> = std::result::Result<T, BlockValidationError>;

/// Errors raised by the validation pipeline.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BlockValidationError {
    /// Block body packages no transactions.
    #[error("Block transactions is empty")]
    EmptyBody,

    /// Block body packages the same transaction id twice.
    #[error("Block contains duplicate transaction")]
    DuplicateTransaction,

    /// Block belongs to a different chain.
    #[error("Block chain id mismatch: got {got}, local {local}")]
    ChainIdMismatch {
        /// Chain id declared by the block.
        got: u32,
        /// This node's chain id.
        local: u32,
    },

    /// Producer signature missing or invalid.
    #[error("Block signature verification failed")]
    InvalidSignature,

    /// Body merkle root does not match the header's declared root.
    #[error("Block merkle tree root mismatch")]
    MerkleRootMismatch,

    /// Block timestamp lies beyond the future tolerance.
    #[error("Future block received: timestamp {timestamp_ms}ms, now {now_ms}ms")]
    FutureBlockTime {
        /// Timestamp declared by the block.
        timestamp_ms: u64,
        /// Local clock at validation time.
        now_ms: u64,
    },

    /// A packaged transaction is already committed on this branch.
    #[error("Transaction {tx_id} repackaged", tx_id = hex::encode(&.0[..8]))]
    RepackagedTransaction(Hash),
}

impl BlockValidationError {
    /// The outward-observable result code for this failure.
    pub fn code(&self) -> ValidationCode {
        match self {
            Self::EmptyBody => ValidationCode::EmptyBody,
            Self::DuplicateTransaction => ValidationCode::DuplicateTransaction,
            Self::ChainIdMismatch { .. } => ValidationCode::ChainIdMismatch,
            Self::InvalidSignature => ValidationCode::InvalidSignature,
            Self::MerkleRootMismatch => ValidationCode::MerkleRootMismatch,
            Self::FutureBlockTime { .. } => ValidationCode::FutureBlockTime,
            Self::RepackagedTransaction(_) => ValidationCode::RepackagedTransaction,
        }
    }
}
