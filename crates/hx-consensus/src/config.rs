//! Consensus configuration.

use shared_types::PublicKey;

/// How the node decides when to produce blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsensusMode {
    /// Full delegated round protocol with commit-reveal.
    Delegated,
    /// Mine whenever the pending transaction pool reaches a size.
    Threshold {
        /// Pool size that triggers a production attempt.
        expected_pool_size: usize,
    },
    /// Mine on a fixed period with no round state. Development chains only.
    SingleNode {
        /// Period between production attempts, in milliseconds.
        interval_ms: u64,
    },
}

/// Engine settings, fixed for the lifetime of the node.
#[derive(Debug, Clone)]
pub struct ConsensusSettings {
    /// The chain this node participates in.
    pub chain_id: u32,
    /// Length of a producer time slot in milliseconds.
    pub mining_interval_ms: u64,
    /// Whether this node seeds the first two rounds when no round state
    /// exists at startup. Exactly one producer per chain should set this.
    pub is_generator: bool,
    /// The static producer set for the first two rounds.
    pub producers: Vec<PublicKey>,
    /// Production trigger mode.
    pub mode: ConsensusMode,
}

impl Default for ConsensusSettings {
    fn default() -> Self {
        Self {
            chain_id: 1,
            mining_interval_ms: 4_000,
            is_generator: false,
            producers: Vec::new(),
            mode: ConsensusMode::Delegated,
        }
    }
}
