//! Mutable engine context: scheduling watermark and the commit-reveal stack.

use shared_crypto::sha256;
use shared_types::Hash;

/// Where the engine is in the round lifecycle. Purely informational; the
/// watermark and timers drive behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No round state observed yet.
    Idle,
    /// Seeding the first two rounds.
    Bootstrapping,
    /// Scheduled, waiting for an owned time slot.
    AwaitingSlot,
    /// Publishing this round's commitment.
    PublishingOutValue,
    /// Revealing this round's secret.
    PublishingInValue,
    /// Electing and publishing the next round.
    AdvancingRound,
}

/// Engine context guarded by a mutex that is never held across an await.
///
/// The commit-reveal stack holds at most one commitment pair: the secret at
/// the bottom, its hash on top. Publishing pops the hash; revealing pops
/// the secret. Starting a new commitment discards any unrevealed remainder.
#[derive(Debug)]
pub struct ConsensusContext {
    /// Highest round number a schedule has been built for. Re-driving the
    /// engine with a round at or below this watermark is a no-op.
    pub round_watermark: u64,
    /// Whether a reveal transaction was emitted since the last sequence
    /// computation. Consumed by the sequence law (+1, then reset).
    pub reveal_emitted: bool,
    /// Current lifecycle state.
    pub state: EngineState,
    reveal_stack: Vec<Hash>,
}

impl ConsensusContext {
    /// Fresh context: watermark 0, empty stack.
    pub fn new() -> Self {
        Self {
            round_watermark: 0,
            reveal_emitted: false,
            state: EngineState::Idle,
            reveal_stack: Vec::with_capacity(2),
        }
    }

    /// Start a new commitment: discard any unrevealed pair, push the secret
    /// then its hash. Returns the hash (the out value to publish).
    pub fn begin_commitment(&mut self, secret: Hash) -> Hash {
        let out_value = sha256(&secret);
        self.reveal_stack.clear();
        self.reveal_stack.push(secret);
        self.reveal_stack.push(out_value);
        out_value
    }

    /// Pop the out value for publication. `None` when no commitment is
    /// pending.
    pub fn take_out_value(&mut self) -> Option<Hash> {
        if self.reveal_stack.len() == 2 {
            self.reveal_stack.pop()
        } else {
            None
        }
    }

    /// Pop the secret for the reveal step. `None` when nothing was
    /// committed this round (the reveal is skipped, not an error).
    pub fn take_secret(&mut self) -> Option<Hash> {
        if self.reveal_stack.len() == 1 {
            self.reveal_stack.pop()
        } else {
            None
        }
    }

    /// Current stack depth (0, 1, or 2).
    pub fn commitment_depth(&self) -> usize {
        self.reveal_stack.len()
    }
}

impl Default for ConsensusContext {
    fn default() -> Self {
        Self::new()
    }
}
