//! The consensus engine.
//!
//! Owns the per-round schedule: when a newer round is observed the engine
//! cancels every armed timer and arms fresh ones for its own slots. The
//! engine is re-driven (via [`ConsensusEngine::reevaluate`]) after every
//! committed block; the round-number watermark makes that idempotent.

use crate::config::{ConsensusMode, ConsensusSettings};
use crate::domain::context::{ConsensusContext, EngineState};
use crate::domain::round_math::{calculate_signature, elect_next_round, generate_first_rounds};
use crate::domain::transactions::{
    build_consensus_transaction, InitializeConsensusParams, PublishInValueParams,
    PublishOutValueParams, UpdateConsensusParams, METHOD_INITIALIZE_CONSENSUS,
    METHOD_PUBLISH_IN_VALUE, METHOD_PUBLISH_OUT_VALUE, METHOD_UPDATE_CONSENSUS,
};
use crate::error::{ConsensusError, Result};
use crate::metrics::{EngineMetrics, MetricsSnapshot};
use crate::policy;
use crate::ports::{AccountStateView, BlockProductionPort, RoundStore, TransactionPoolPort};
use parking_lot::Mutex;
use shared_crypto::{sha256, NodeKeyPair};
use shared_types::Hash;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Result of a schedule re-evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// A newer round was observed; the schedule was rebuilt.
    Scheduled,
    /// The observed round is at or below the watermark; nothing changed.
    Unchanged,
    /// No round state exists yet.
    NoRound,
}

/// A cancellable armed timer (an aborted task simply never fires).
struct SlotTimer {
    handle: tokio::task::JoinHandle<()>,
}

impl SlotTimer {
    fn cancel(&self) {
        self.handle.abort();
    }
}

#[derive(Debug, Clone, Copy)]
enum TimerAction {
    PublishOutValue { round_number: u64 },
    PublishInValue { round_number: u64 },
    AdvanceRound { round_number: u64 },
    RetryMining,
}

/// The delegated consensus engine, generic over its outbound ports.
pub struct ConsensusEngine<P, A, B, R> {
    settings: ConsensusSettings,
    keypair: Arc<NodeKeyPair>,
    pool: Arc<P>,
    accounts: Arc<A>,
    producer: Arc<B>,
    rounds: Arc<R>,
    context: Mutex<ConsensusContext>,
    timers: Mutex<Vec<SlotTimer>>,
    metrics: Arc<EngineMetrics>,
}

impl<P, A, B, R> ConsensusEngine<P, A, B, R>
where
    P: TransactionPoolPort + 'static,
    A: AccountStateView + 'static,
    B: BlockProductionPort + 'static,
    R: RoundStore + 'static,
{
    /// Create an engine. Nothing runs until [`ConsensusEngine::start`] or
    /// [`ConsensusEngine::reevaluate`] is called.
    pub fn new(
        settings: ConsensusSettings,
        keypair: Arc<NodeKeyPair>,
        pool: Arc<P>,
        accounts: Arc<A>,
        producer: Arc<B>,
        rounds: Arc<R>,
    ) -> Arc<Self> {
        Arc::new(Self {
            settings,
            keypair,
            pool,
            accounts,
            producer,
            rounds,
            context: Mutex::new(ConsensusContext::new()),
            timers: Mutex::new(Vec::new()),
            metrics: Arc::new(EngineMetrics::new()),
        })
    }

    /// Start background work for the configured mode.
    pub fn start(self: &Arc<Self>) {
        match self.settings.mode {
            ConsensusMode::Delegated => {
                info!("[hx-consensus] Starting in delegated mode");
                let engine = Arc::clone(self);
                tokio::spawn(async move {
                    if let Err(err) = engine.bootstrap().await {
                        warn!("[hx-consensus] Bootstrap failed: {err}");
                    }
                    engine.reevaluate().await;
                });
            }
            ConsensusMode::Threshold { expected_pool_size } => {
                info!(
                    "[hx-consensus] Starting in threshold mode (pool size {})",
                    expected_pool_size
                );
                let handle = tokio::spawn(policy::run_threshold(
                    Arc::clone(self),
                    expected_pool_size,
                ));
                self.timers.lock().push(SlotTimer { handle });
            }
            ConsensusMode::SingleNode { interval_ms } => {
                info!(
                    "[hx-consensus] Starting in single-node mode ({interval_ms}ms period)"
                );
                let handle =
                    tokio::spawn(policy::run_single_node(Arc::clone(self), interval_ms));
                self.timers.lock().push(SlotTimer { handle });
            }
        }
    }

    /// Cancel all armed timers and background loops.
    pub fn shutdown(&self) {
        let timers: Vec<SlotTimer> = self.timers.lock().drain(..).collect();
        for timer in &timers {
            timer.cancel();
        }
        info!("[hx-consensus] Engine shut down ({} timers cancelled)", timers.len());
    }

    /// Seed the first two rounds of a fresh chain.
    ///
    /// No-op unless this node is the configured generator and no round
    /// state exists. The two rounds travel in one `InitializeConsensus`
    /// transaction packaged into the genesis-adjacent block this call mines.
    pub async fn bootstrap(self: &Arc<Self>) -> Result<()> {
        if !self.settings.is_generator {
            return Ok(());
        }
        if self.rounds.current_round().await.is_some() {
            debug!("[hx-consensus] Round state already present, skipping bootstrap");
            return Ok(());
        }
        self.context.lock().state = EngineState::Bootstrapping;

        let (first_round, second_round) = generate_first_rounds(
            &self.settings.producers,
            self.settings.mining_interval_ms,
            now_ms(),
        )
        .ok_or(ConsensusError::NoProducers)?;
        info!(
            "[hx-consensus] Bootstrapping chain: {} producers, {}ms slots",
            self.settings.producers.len(),
            self.settings.mining_interval_ms
        );

        let params = bincode::serialize(&InitializeConsensusParams {
            first_round,
            second_round,
        })?;
        let sequence = self.next_sequence().await;
        let tx =
            build_consensus_transaction(&self.keypair, METHOD_INITIALIZE_CONSENSUS, params, sequence);
        self.pool.submit(tx).await;
        self.mine_now().await;
        Ok(())
    }

    /// Rebuild the schedule if a newer round has been committed.
    ///
    /// Called after every block commit. Idempotent per round: once a round
    /// number has been scheduled, further calls observing the same round do
    /// nothing (and cancel nothing).
    pub async fn reevaluate(self: &Arc<Self>) -> ScheduleOutcome {
        let Some(round) = self.rounds.current_round().await else {
            return ScheduleOutcome::NoRound;
        };

        {
            let mut ctx = self.context.lock();
            if round.round_number <= ctx.round_watermark {
                return ScheduleOutcome::Unchanged;
            }
            ctx.round_watermark = round.round_number;
            ctx.state = EngineState::AwaitingSlot;
        }
        self.cancel_timers();
        self.metrics.rounds_scheduled.fetch_add(1, Ordering::Relaxed);

        let me = self.keypair.public_key();
        let now = now_ms();
        let round_number = round.round_number;
        let mut armed = Vec::new();

        if let Some(info) = round.producer(&me) {
            armed.push(self.arm_timer(
                delay_until(info.time_slot_ms, now),
                TimerAction::PublishOutValue { round_number },
            ));
            let reveal_at = round
                .extra_block_time_slot_ms
                .saturating_sub(round.mining_interval_ms / 2);
            armed.push(self.arm_timer(
                delay_until(reveal_at, now),
                TimerAction::PublishInValue { round_number },
            ));
        }
        if round.is_extra_block_producer(&me) {
            armed.push(self.arm_timer(
                delay_until(round.extra_block_time_slot_ms, now),
                TimerAction::AdvanceRound { round_number },
            ));
        }

        info!(
            "[hx-consensus] Scheduled round {} ({} timers armed)",
            round_number,
            armed.len()
        );
        self.timers.lock().extend(armed);
        ScheduleOutcome::Scheduled
    }

    /// The sequence number for this node's next consensus transaction.
    ///
    /// The base is the maximum of the pool's view and persisted state. An
    /// un-mined reveal adds one exactly once: the flag is consumed here.
    pub async fn next_sequence(&self) -> u64 {
        let account = self.keypair.public_key();
        let pool_next = self.pool.next_sequence(&account).await;
        let persisted = self.accounts.persisted_sequence(&account).await;
        let base = pool_next.map_or(persisted, |p| p.max(persisted));

        let mut ctx = self.context.lock();
        if ctx.reveal_emitted {
            ctx.reveal_emitted = false;
            base + 1
        } else {
            base
        }
    }

    /// Counter snapshot for operators and tests.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// The engine's settings.
    pub fn settings(&self) -> &ConsensusSettings {
        &self.settings
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EngineState {
        self.context.lock().state
    }

    async fn publish_out_value(self: &Arc<Self>, round_number: u64) -> Result<()> {
        let round = self
            .rounds
            .current_round()
            .await
            .ok_or(ConsensusError::NoActiveRound)?;
        if round.round_number != round_number {
            debug!(
                "[hx-consensus] Out-value slot for round {round_number} superseded by round {}",
                round.round_number
            );
            return Ok(());
        }
        let me = self.keypair.public_key();
        if round.producer(&me).is_none() {
            return Ok(());
        }

        let secret: Hash = rand::random();
        let out_value = {
            let mut ctx = self.context.lock();
            ctx.state = EngineState::PublishingOutValue;
            ctx.begin_commitment(secret);
            ctx.take_out_value().ok_or(ConsensusError::MissingCommitment)?
        };
        let signature = match self.rounds.round(round_number.saturating_sub(1)).await {
            Some(previous) => calculate_signature(&previous, &secret),
            None => sha256(&secret),
        };

        let params = bincode::serialize(&PublishOutValueParams {
            round_number,
            out_value,
            signature,
        })?;
        let sequence = self.next_sequence().await;
        let tx =
            build_consensus_transaction(&self.keypair, METHOD_PUBLISH_OUT_VALUE, params, sequence);
        info!(
            "[hx-consensus] Publishing out value {} for round {round_number}",
            hex::encode(&out_value[..8])
        );
        self.pool.submit(tx).await;
        self.mine_now().await;
        Ok(())
    }

    async fn publish_in_value(self: &Arc<Self>, round_number: u64) -> Result<()> {
        let round = self
            .rounds
            .current_round()
            .await
            .ok_or(ConsensusError::NoActiveRound)?;
        if round.round_number != round_number {
            return Ok(());
        }

        let secret = {
            let mut ctx = self.context.lock();
            ctx.state = EngineState::PublishingInValue;
            ctx.take_secret()
        };
        let Some(in_value) = secret else {
            // Nothing committed this round; the reveal is skipped.
            debug!("[hx-consensus] No pending commitment for round {round_number}, skipping reveal");
            return Ok(());
        };

        let params = bincode::serialize(&PublishInValueParams {
            round_number,
            in_value,
        })?;
        let sequence = self.next_sequence().await;
        let tx =
            build_consensus_transaction(&self.keypair, METHOD_PUBLISH_IN_VALUE, params, sequence);
        info!("[hx-consensus] Revealing in value for round {round_number}");
        self.pool.submit(tx).await;
        self.context.lock().reveal_emitted = true;
        Ok(())
    }

    async fn advance_round(self: &Arc<Self>, round_number: u64) -> Result<()> {
        let round = self
            .rounds
            .current_round()
            .await
            .ok_or(ConsensusError::NoActiveRound)?;
        if round.round_number != round_number {
            return Ok(());
        }
        if !round.is_extra_block_producer(&self.keypair.public_key()) {
            return Ok(());
        }
        self.context.lock().state = EngineState::AdvancingRound;

        let next_round = elect_next_round(&round).ok_or(ConsensusError::NoProducers)?;
        info!(
            "[hx-consensus] Advancing round {} -> {}",
            round_number, next_round.round_number
        );

        let params = bincode::serialize(&UpdateConsensusParams { next_round })?;
        let sequence = self.next_sequence().await;
        let tx =
            build_consensus_transaction(&self.keypair, METHOD_UPDATE_CONSENSUS, params, sequence);
        self.pool.submit(tx).await;
        self.mine_now().await;
        Ok(())
    }

    /// One production attempt with a single delayed retry on failure. The
    /// commit path re-drives scheduling, so nothing else happens here.
    pub(crate) async fn mine_now(self: &Arc<Self>) {
        self.metrics.mining_attempts.fetch_add(1, Ordering::Relaxed);
        match self.producer.produce_and_commit().await {
            Some(hash) => {
                debug!("[hx-consensus] Produced block {}", hex::encode(&hash[..8]));
            }
            None => {
                self.metrics.mining_failures.fetch_add(1, Ordering::Relaxed);
                let retry_after = Duration::from_millis(self.settings.mining_interval_ms / 10);
                warn!(
                    "[hx-consensus] Production attempt yielded no block, retrying in {:?}",
                    retry_after
                );
                let timer = self.arm_timer(retry_after, TimerAction::RetryMining);
                self.timers.lock().push(timer);
            }
        }
    }

    pub(crate) async fn pending_pool_size(&self) -> usize {
        self.pool.pending_count().await
    }

    fn arm_timer(self: &Arc<Self>, delay: Duration, action: TimerAction) -> SlotTimer {
        self.metrics.timers_armed.fetch_add(1, Ordering::Relaxed);
        let engine = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            engine.fire(action).await;
        });
        SlotTimer { handle }
    }

    async fn fire(self: &Arc<Self>, action: TimerAction) {
        let outcome = match action {
            TimerAction::PublishOutValue { round_number } => {
                self.publish_out_value(round_number).await
            }
            TimerAction::PublishInValue { round_number } => {
                self.publish_in_value(round_number).await
            }
            TimerAction::AdvanceRound { round_number } => self.advance_round(round_number).await,
            TimerAction::RetryMining => {
                self.metrics.mining_attempts.fetch_add(1, Ordering::Relaxed);
                if self.producer.produce_and_commit().await.is_none() {
                    self.metrics.mining_failures.fetch_add(1, Ordering::Relaxed);
                    warn!("[hx-consensus] Retry production attempt also yielded no block");
                }
                Ok(())
            }
        };
        if let Err(err) = outcome {
            if err.is_recoverable() {
                debug!("[hx-consensus] Timer action {action:?} deferred: {err}");
            } else {
                warn!("[hx-consensus] Timer action {action:?} failed: {err}");
            }
        }
    }

    fn cancel_timers(&self) {
        let timers: Vec<SlotTimer> = self.timers.lock().drain(..).collect();
        for timer in &timers {
            timer.cancel();
        }
        self.metrics
            .timers_cancelled
            .fetch_add(timers.len() as u64, Ordering::Relaxed);
        if !timers.is_empty() {
            debug!("[hx-consensus] Cancelled {} stale timers", timers.len());
        }
    }
}

fn delay_until(slot_ms: u64, now_ms: u64) -> Duration {
    Duration::from_millis(slot_ms.saturating_sub(now_ms))
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
