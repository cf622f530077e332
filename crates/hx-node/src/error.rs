//! Error types for the node runtime.

use thiserror::Error;

/// Result type alias for node operations.
pub type Result<T> = std::result::Result<T, NodeError>;

/// Errors raised by the node's outward surface. Failures inside the commit
/// pipeline are reported as [`shared_types::CommitOutcome`] codes instead.
#[derive(Debug, Error)]
pub enum NodeError {
    /// A wire payload failed to encode or decode.
    #[error("Codec failure: {0}")]
    Codec(#[from] bincode::Error),
}
