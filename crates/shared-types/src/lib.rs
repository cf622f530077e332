//! # Helix-Chain Shared Types
//!
//! Core domain entities used by every subsystem of the node.
//!
//! ## Clusters
//!
//! - **Chain**: [`Block`], [`BlockHeader`], [`BlockBody`], [`Transaction`]
//! - **Consensus**: [`Round`], [`ProducerInfo`] (commit-reveal artifacts)
//! - **Commit results**: [`ValidationCode`], [`CommitOutcome`]
//! - **Concurrency**: [`ExclusionFlag`] / [`ExclusionGuard`] - the single
//!   process-wide token that keeps mining and block import mutually exclusive
//! - **Networking**: [`NetworkMessage`], [`InboundEnvelope`]

#![warn(missing_docs)]
#![warn(clippy::all)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod entities;
pub mod exclusion;
pub mod messages;
pub mod round;
pub mod validation;

pub use entities::{
    Address, Block, BlockBody, BlockHeader, Hash, PublicKey, Signature, Transaction,
};
pub use exclusion::{ExclusionFlag, ExclusionGuard};
pub use messages::{InboundEnvelope, NetworkMessage, NodeId};
pub use round::{ProducerInfo, Round};
pub use validation::{CommitOutcome, ValidationCode};

/// Height of the genesis block. Signature checks are skipped at this height.
pub const GENESIS_HEIGHT: u64 = 1;

/// Default tolerance for block timestamps that lie in the future.
pub const DEFAULT_FUTURE_BLOCK_TOLERANCE_MS: u64 = 4_000;
