//! # Consensus Rounds
//!
//! One [`Round`] is an epoch of the delegated producer schedule: a fixed
//! producer order with per-producer time slots, plus an extra-block slot at
//! the round's end held by a designated producer. Rounds are created at
//! epoch start, mutated in place as commit-reveal data arrives, and
//! superseded (not deleted) when the round advances.

use crate::entities::{Hash, PublicKey};
use serde::{Deserialize, Serialize};

/// Per-producer consensus artifacts for one round.
///
/// `out_value` / `in_value` are the delayed commit-reveal pair: the out
/// value (a hash of the secret) is published early in the round, the in
/// value (the secret itself) is revealed near the round's end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerInfo {
    /// The producer's key.
    pub address: PublicKey,
    /// Position in the round's mining order (0-based).
    pub order: u32,
    /// Unix milliseconds at which this producer's mining slot opens.
    pub time_slot_ms: u64,
    /// Committed hash of the producer's round secret.
    pub out_value: Option<Hash>,
    /// Signature over round data, derived from the previous round's secret.
    pub signature: Option<Hash>,
    /// The revealed round secret.
    pub in_value: Option<Hash>,
}

impl ProducerInfo {
    /// A fresh slot assignment with no commit-reveal data yet.
    pub fn new(address: PublicKey, order: u32, time_slot_ms: u64) -> Self {
        Self {
            address,
            order,
            time_slot_ms,
            out_value: None,
            signature: None,
            in_value: None,
        }
    }
}

/// One epoch of the consensus schedule. Round numbers advance monotonically;
/// exactly one round is active at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    /// Monotonically increasing round number, starting at 1.
    pub round_number: u64,
    /// Producers in mining order.
    pub producers: Vec<ProducerInfo>,
    /// Producer holding the round-end extra-block slot.
    pub extra_block_producer: PublicKey,
    /// Unix milliseconds at which the extra-block slot opens.
    pub extra_block_time_slot_ms: u64,
    /// Expected interval between blocks within the round, in milliseconds.
    pub mining_interval_ms: u64,
}

impl Round {
    /// Look up a producer's slot info by key.
    pub fn producer(&self, address: &PublicKey) -> Option<&ProducerInfo> {
        self.producers.iter().find(|p| &p.address == address)
    }

    /// Mutable lookup, used while merging commit-reveal publications.
    pub fn producer_mut(&mut self, address: &PublicKey) -> Option<&mut ProducerInfo> {
        self.producers.iter_mut().find(|p| &p.address == address)
    }

    /// Whether the given key holds this round's extra-block slot.
    pub fn is_extra_block_producer(&self, address: &PublicKey) -> bool {
        &self.extra_block_producer == address
    }
}
