//! # Helix-Chain Node Runtime
//!
//! Wires the consensus engine, miner, validation pipeline, and commit
//! controller into a running node:
//!
//! - [`controller::BlockCommitController`] - the single entry point through
//!   which every block (mined or received) reaches the chain, including
//!   orphan-branch rollback.
//! - [`service::NodeService`] - the single-consumer network message loop.
//! - [`adapters`] - in-memory state, pool, and chain implementations plus
//!   the glue between the consensus engine's ports and the rest.
//! - [`runtime`] - assembly of all of the above from a [`config::NodeConfig`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod config;
pub mod controller;
mod error;
pub mod ports;
pub mod runtime;
pub mod service;

pub use config::NodeConfig;
pub use controller::BlockCommitController;
pub use error::{NodeError, Result};
pub use runtime::{NodeRuntime, RunningNode};
pub use service::{NodeHandle, NodeService};
