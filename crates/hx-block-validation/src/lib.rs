//! # Helix-Chain Block Validation
//!
//! The three-phase gate a candidate block must pass before and while being
//! applied:
//!
//! 1. **`validate_before_attach`** - structural: header integrity, duplicate
//!    transaction ids, chain id, producer signature, merkle root, future
//!    timestamp tolerance. Any failure rejects the block before it can touch
//!    world state.
//! 2. **`validate_before_execute`** - anti-replay: every packaged transaction
//!    must not already be committed on the branch identified by the block's
//!    previous hash.
//! 3. **`validate_after_execute`** - diagnostic checkpoint for invariants
//!    only checkable after state mutation; reported, never a rollback
//!    trigger.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
pub mod pipeline;
pub mod ports;

pub use error::{BlockValidationError, Result};
pub use pipeline::{PipelineConfig, ValidationPipeline, ValidationReport};
pub use ports::{SystemTimeSource, TimeSource, TransactionBlockIndex};
