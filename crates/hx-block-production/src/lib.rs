//! # Helix-Chain Block Production
//!
//! The miner packages ready transactions into a signed block. Production is
//! guarded by the shared exclusion flag (mining and block import never
//! overlap) and bounded by a hard deadline at 90% of the slot interval so a
//! slow attempt can never bleed into the next producer's slot.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod config;
mod error;
pub mod miner;
pub mod ports;

pub use config::MinerConfig;
pub use error::{MinerError, Result};
pub use miner::Miner;
pub use ports::{ChainHeadView, ExecutionError, ReadyTransactionPool, TransactionExecutor};
