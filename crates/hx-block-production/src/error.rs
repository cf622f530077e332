//! Error types for block production.

use crate::ports::ExecutionError;
use thiserror::Error;

/// Result type alias for block production operations.
pub type Result<T> = std::result::Result<T, MinerError>;

/// Errors raised while building a block.
#[derive(Debug, Error)]
pub enum MinerError {
    /// The pool yielded no ready transactions for this slot.
    #[error("No ready transactions to package")]
    NothingToPackage,

    /// The execution engine rejected the packaged transactions.
    #[error("Block execution failed: {0}")]
    Execution(#[from] ExecutionError),
}
