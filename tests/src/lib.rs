//! # Helix-Chain Test Suite
//!
//! Unified test crate for scenarios that span more than one crate.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/          # Cross-crate choreography
//!     ├── flows.rs          # Message-loop flows: gossip, catch-up, branch switch
//!     ├── production_gate.rs   # Mined blocks against the validation gate
//!     └── e2e_choreography.rs  # Full-runtime scenarios over wired nodes
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p hx-tests
//!
//! # By category
//! cargo test -p hx-tests integration::flows
//! cargo test -p hx-tests integration::e2e
//! ```

#![allow(unused_imports)]
#![allow(dead_code)]

pub mod integration;
