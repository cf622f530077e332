//! Error types for the consensus engine.

use thiserror::Error;

/// Result type alias for consensus operations.
pub type Result<T> = std::result::Result<T, ConsensusError>;

/// Errors raised by the consensus engine.
#[derive(Debug, Error)]
pub enum ConsensusError {
    /// No round state is available yet (node still syncing, or bootstrap
    /// has not run).
    #[error("No active consensus round")]
    NoActiveRound,

    /// The producer set is empty; rounds cannot be generated.
    #[error("Producer set is empty")]
    NoProducers,

    /// A reveal was attempted with no pending commitment on the stack.
    #[error("No pending commitment to reveal")]
    MissingCommitment,

    /// Consensus transaction parameters failed to encode.
    #[error("Consensus parameter encoding failed: {0}")]
    Codec(#[from] bincode::Error),
}

impl ConsensusError {
    /// Whether the operation may succeed if retried later.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::NoActiveRound | Self::MissingCommitment)
    }
}
