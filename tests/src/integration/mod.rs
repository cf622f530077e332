//! Cross-crate integration scenarios.

pub mod e2e_choreography;
pub mod flows;
pub mod production_gate;
