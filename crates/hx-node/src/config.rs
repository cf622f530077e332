//! Node configuration.
//!
//! One tree for all subsystems, with conversion helpers into each
//! subsystem's own config type. Defaults describe a small development
//! chain; the binary overrides from `HX_*` environment variables.

use hx_block_production::MinerConfig;
use hx_block_validation::PipelineConfig;
use hx_consensus::{ConsensusMode, ConsensusSettings};
use shared_types::PublicKey;

/// Complete node configuration.
#[derive(Debug, Clone, Default)]
pub struct NodeConfig {
    /// Chain identity.
    pub chain: ChainConfig,
    /// Consensus and block production.
    pub consensus: ConsensusConfig,
    /// Runtime limits.
    pub runtime: RuntimeConfig,
}

/// Chain identity configuration.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    /// Chain identifier; blocks from other chains are rejected.
    pub chain_id: u32,
    /// Protocol version stamped into produced headers.
    pub version: u16,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: 1,
            version: 1,
        }
    }
}

/// Consensus configuration.
#[derive(Debug, Clone)]
pub struct ConsensusConfig {
    /// Length of a producer time slot in milliseconds.
    pub mining_interval_ms: u64,
    /// Whether this node seeds the first two rounds at startup.
    pub is_generator: bool,
    /// The static producer set for the first two rounds.
    pub producers: Vec<PublicKey>,
    /// Production trigger mode.
    pub mode: ConsensusMode,
    /// Optional fixed signing seed (hex, 32 bytes). Random when unset.
    pub key_seed: Option<[u8; 32]>,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            mining_interval_ms: 4_000,
            is_generator: false,
            producers: Vec::new(),
            mode: ConsensusMode::Delegated,
            key_seed: None,
        }
    }
}

/// Runtime limits.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Bound of the inbound network message queue.
    pub message_queue_capacity: usize,
    /// Maximum transactions packaged into one block.
    pub max_transactions_per_block: usize,
    /// Tolerance for block timestamps in the future, in milliseconds.
    pub future_tolerance_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            message_queue_capacity: 1_024,
            max_transactions_per_block: 1_024,
            future_tolerance_ms: shared_types::DEFAULT_FUTURE_BLOCK_TOLERANCE_MS,
        }
    }
}

impl NodeConfig {
    /// Settings for the consensus engine.
    pub fn consensus_settings(&self) -> ConsensusSettings {
        ConsensusSettings {
            chain_id: self.chain.chain_id,
            mining_interval_ms: self.consensus.mining_interval_ms,
            is_generator: self.consensus.is_generator,
            producers: self.consensus.producers.clone(),
            mode: self.consensus.mode.clone(),
        }
    }

    /// Settings for the miner.
    pub fn miner_config(&self) -> MinerConfig {
        MinerConfig {
            chain_id: self.chain.chain_id,
            version: self.chain.version,
            mining_interval_ms: self.consensus.mining_interval_ms,
            max_transactions_per_block: self.runtime.max_transactions_per_block,
        }
    }

    /// Settings for the validation pipeline.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            chain_id: self.chain.chain_id,
            future_tolerance_ms: self.runtime.future_tolerance_ms,
        }
    }
}
