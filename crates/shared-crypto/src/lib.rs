//! # Helix-Chain Shared Crypto
//!
//! Hashing and signing primitives used across the node.
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `hashing` | SHA-256 | Block/transaction ids, merkle roots, round seeds |
//! | `keys` | Ed25519 | Producer and transaction signatures |

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod hashing;
pub mod keys;

pub use errors::CryptoError;
pub use hashing::{hash_pair, merkle_root, sha256, sha256_concat};
pub use keys::{verify_signature, NodeKeyPair};
