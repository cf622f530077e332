//! # Helix-Chain Consensus
//!
//! The delegated-producer consensus engine. Each round is an epoch with a
//! fixed producer order; producers run a delayed commit-reveal protocol
//! (publish a hash of a secret early, reveal the secret late) whose merged
//! artifacts seed the next round's election.
//!
//! ## Scheduling model
//!
//! The engine is re-driven after every committed block. A round-number
//! watermark makes re-driving idempotent: schedules are rebuilt (old timers
//! cancelled, new ones armed) only when the observed round is newer than the
//! last one scheduled.
//!
//! ## Modes
//!
//! - **Delegated** - the full round protocol above.
//! - **Threshold** - mine whenever the pending pool reaches a size.
//! - **SingleNode** - mine on a fixed period, no round state.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod config;
pub mod domain;
mod engine;
mod error;
mod metrics;
pub mod policy;
pub mod ports;

pub use config::{ConsensusMode, ConsensusSettings};
pub use engine::{ConsensusEngine, ScheduleOutcome};
pub use error::{ConsensusError, Result};
pub use metrics::{EngineMetrics, MetricsSnapshot};
