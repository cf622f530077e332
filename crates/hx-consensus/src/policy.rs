//! Alternate production policies: threshold and single-node modes.
//!
//! Both are flat loops with none of the round machinery; they exist for
//! development chains and load testing. The loops run until the engine is
//! shut down (their tasks are cancelled with the rest of the timers).

use crate::engine::ConsensusEngine;
use crate::ports::{AccountStateView, BlockProductionPort, RoundStore, TransactionPoolPort};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// How many times per slot interval the threshold loop polls the pool.
const POLLS_PER_INTERVAL: u64 = 4;

/// Mine whenever the pending pool reaches `expected_pool_size`.
pub(crate) async fn run_threshold<P, A, B, R>(
    engine: Arc<ConsensusEngine<P, A, B, R>>,
    expected_pool_size: usize,
) where
    P: TransactionPoolPort + 'static,
    A: AccountStateView + 'static,
    B: BlockProductionPort + 'static,
    R: RoundStore + 'static,
{
    let poll_every = Duration::from_millis(
        (engine.settings().mining_interval_ms / POLLS_PER_INTERVAL).max(1),
    );
    let mut ticker = tokio::time::interval(poll_every);
    loop {
        ticker.tick().await;
        let pending = engine.pending_pool_size().await;
        if pending >= expected_pool_size {
            debug!(
                "[hx-consensus] Pool reached {pending} (threshold {expected_pool_size}), producing"
            );
            engine.mine_now().await;
        }
    }
}

/// Mine on a fixed period regardless of pool contents.
pub(crate) async fn run_single_node<P, A, B, R>(
    engine: Arc<ConsensusEngine<P, A, B, R>>,
    interval_ms: u64,
) where
    P: TransactionPoolPort + 'static,
    A: AccountStateView + 'static,
    B: BlockProductionPort + 'static,
    R: RoundStore + 'static,
{
    let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms.max(1)));
    // The first tick completes immediately; skip it so the first block
    // lands one full period after startup.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        engine.mine_now().await;
    }
}
