//! Engine counters.
//!
//! The armed/cancelled pair is the observable face of the idempotent
//! scheduling guard: re-driving the engine without a round change arms
//! nothing, while a round change cancels exactly the timers the previous
//! round armed.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counters maintained by the consensus engine.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    /// Timers armed across all schedule rebuilds.
    pub timers_armed: AtomicU64,
    /// Timers cancelled across all schedule rebuilds.
    pub timers_cancelled: AtomicU64,
    /// Schedule rebuilds accepted (round watermark advanced).
    pub rounds_scheduled: AtomicU64,
    /// Block production attempts dispatched.
    pub mining_attempts: AtomicU64,
    /// Production attempts that yielded no block.
    pub mining_failures: AtomicU64,
}

impl EngineMetrics {
    /// Fresh zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consistent point-in-time copy of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timers_armed: self.timers_armed.load(Ordering::Relaxed),
            timers_cancelled: self.timers_cancelled.load(Ordering::Relaxed),
            rounds_scheduled: self.rounds_scheduled.load(Ordering::Relaxed),
            mining_attempts: self.mining_attempts.load(Ordering::Relaxed),
            mining_failures: self.mining_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`EngineMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Timers armed across all schedule rebuilds.
    pub timers_armed: u64,
    /// Timers cancelled across all schedule rebuilds.
    pub timers_cancelled: u64,
    /// Schedule rebuilds accepted.
    pub rounds_scheduled: u64,
    /// Block production attempts dispatched.
    pub mining_attempts: u64,
    /// Production attempts that yielded no block.
    pub mining_failures: u64,
}
