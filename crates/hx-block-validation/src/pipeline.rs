//! The three-phase validation pipeline.

use crate::error::{BlockValidationError, Result};
use crate::ports::{TimeSource, TransactionBlockIndex};
use shared_crypto::{merkle_root, verify_signature};
use shared_types::{Block, Hash, GENESIS_HEIGHT};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Pipeline tuning knobs.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The chain this node validates blocks for.
    pub chain_id: u32,
    /// How far into the future a block timestamp may lie before rejection.
    pub future_tolerance_ms: u64,
}

impl PipelineConfig {
    /// Config for the given chain with the default future tolerance.
    pub fn for_chain(chain_id: u32) -> Self {
        Self {
            chain_id,
            future_tolerance_ms: shared_types::DEFAULT_FUTURE_BLOCK_TOLERANCE_MS,
        }
    }
}

/// Post-execution diagnostic report. Never triggers a rollback; anomalies
/// are surfaced for operators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    /// Hash of the block the report covers.
    pub block_hash: Hash,
    /// Height of the block.
    pub height: u64,
    /// Anomalies observed after execution, empty when clean.
    pub anomalies: Vec<String>,
}

impl ValidationReport {
    /// Whether the post-execution checkpoint found nothing to report.
    pub fn is_clean(&self) -> bool {
        self.anomalies.is_empty()
    }
}

/// Three-phase block validation gate.
///
/// Phase one is synchronous and pure; phase two consults the transaction
/// index on the block's branch; phase three is a diagnostic checkpoint run
/// after execution.
pub struct ValidationPipeline<I> {
    config: PipelineConfig,
    index: Arc<I>,
    time: Box<dyn TimeSource>,
}

impl<I: TransactionBlockIndex> ValidationPipeline<I> {
    /// Create a pipeline over the given transaction index and clock.
    pub fn new(config: PipelineConfig, index: Arc<I>, time: Box<dyn TimeSource>) -> Self {
        Self {
            config,
            index,
            time,
        }
    }

    /// Phase one: structural checks, before the block may touch any state.
    ///
    /// Checks in order: non-empty body, no duplicate transaction ids, chain
    /// id, producer signature over the header hash (skipped for the genesis
    /// block, which has no producer), merkle root, future-timestamp
    /// tolerance. The first failure wins.
    pub fn validate_before_attach(&self, block: &Block) -> Result<()> {
        let header = &block.header;

        if block.body.transaction_ids.is_empty() {
            return Err(BlockValidationError::EmptyBody);
        }

        let mut seen = HashSet::with_capacity(block.body.transaction_ids.len());
        for tx_id in &block.body.transaction_ids {
            if !seen.insert(tx_id) {
                return Err(BlockValidationError::DuplicateTransaction);
            }
        }

        if header.chain_id != self.config.chain_id {
            return Err(BlockValidationError::ChainIdMismatch {
                got: header.chain_id,
                local: self.config.chain_id,
            });
        }

        if header.height != GENESIS_HEIGHT {
            verify_signature(&header.producer, &header.hash(), &header.signature)
                .map_err(|_| BlockValidationError::InvalidSignature)?;
        }

        if merkle_root(&block.body.transaction_ids) != header.merkle_root {
            return Err(BlockValidationError::MerkleRootMismatch);
        }

        let now_ms = self.time.now_ms();
        if header.timestamp_ms > now_ms + self.config.future_tolerance_ms {
            return Err(BlockValidationError::FutureBlockTime {
                timestamp_ms: header.timestamp_ms,
                now_ms,
            });
        }

        debug!(
            "[hx-validation] Structural checks passed for block {} at height {}",
            hex::encode(&block.hash()[..8]),
            header.height
        );
        Ok(())
    }

    /// Phase two: anti-replay. Every packaged transaction must be absent
    /// from the branch the block extends (identified by its previous hash).
    pub async fn validate_before_execute(&self, block: &Block) -> Result<()> {
        let branch = &block.header.previous_block_hash;
        for tx_id in &block.body.transaction_ids {
            if let Some(containing) = self.index.block_containing(tx_id, branch).await {
                warn!(
                    "[hx-validation] Transaction {} already committed in block {}",
                    hex::encode(&tx_id[..8]),
                    hex::encode(&containing[..8])
                );
                return Err(BlockValidationError::RepackagedTransaction(*tx_id));
            }
        }
        Ok(())
    }

    /// Phase three: post-execution checkpoint. `executed_tx_ids` is the set
    /// of transactions the execution engine actually applied; divergence
    /// from the packaged set is reported, never rolled back.
    pub fn validate_after_execute(&self, block: &Block, executed_tx_ids: &[Hash]) -> ValidationReport {
        let mut anomalies = Vec::new();

        if executed_tx_ids.len() != block.body.transactions_count() {
            anomalies.push(format!(
                "executed {} of {} packaged transactions",
                executed_tx_ids.len(),
                block.body.transactions_count()
            ));
        }

        let packaged: HashSet<&Hash> = block.body.transaction_ids.iter().collect();
        for tx_id in executed_tx_ids {
            if !packaged.contains(tx_id) {
                anomalies.push(format!(
                    "executed transaction {} not packaged in the block",
                    hex::encode(&tx_id[..8])
                ));
            }
        }

        let report = ValidationReport {
            block_hash: block.hash(),
            height: block.height(),
            anomalies,
        };
        if !report.is_clean() {
            warn!(
                "[hx-validation] Post-execution anomalies at height {}: {:?}",
                report.height, report.anomalies
            );
        }
        report
    }
}
