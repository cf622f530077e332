//! Pure consensus domain logic: no I/O, no runtime.

pub mod context;
pub mod round_math;
pub mod transactions;

pub use context::{ConsensusContext, EngineState};
