//! Block production configuration.

use std::time::Duration;

/// Miner tuning knobs.
#[derive(Debug, Clone)]
pub struct MinerConfig {
    /// The chain this node produces blocks for.
    pub chain_id: u32,
    /// Protocol version stamped into produced headers.
    pub version: u16,
    /// Length of a producer time slot in milliseconds.
    pub mining_interval_ms: u64,
    /// Maximum transactions packaged into one block.
    pub max_transactions_per_block: usize,
}

impl MinerConfig {
    /// The hard deadline for one production attempt: 90% of the slot.
    ///
    /// Finishing inside the slot with margin keeps a slow attempt from
    /// bleeding into the next producer's slot.
    pub fn production_deadline(&self) -> Duration {
        Duration::from_millis(self.mining_interval_ms * 9 / 10)
    }
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            chain_id: 1,
            version: 1,
            mining_interval_ms: 4_000,
            max_transactions_per_block: 1_024,
        }
    }
}
