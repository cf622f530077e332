//! Consensus system transactions.
//!
//! Round state advances through ordinary transactions addressed to the
//! consensus account and executed at block commit, so every node derives
//! identical round state from the chain alone.

use serde::{Deserialize, Serialize};
use shared_crypto::{sha256, NodeKeyPair};
use shared_types::{Address, Hash, Round, Transaction};

/// Method seeding the first two rounds of a fresh chain.
pub const METHOD_INITIALIZE_CONSENSUS: &str = "InitializeConsensus";
/// Method publishing a producer's commitment and round signature.
pub const METHOD_PUBLISH_OUT_VALUE: &str = "PublishOutValueAndSignature";
/// Method revealing a producer's round secret.
pub const METHOD_PUBLISH_IN_VALUE: &str = "PublishInValue";
/// Method publishing the elected next round.
pub const METHOD_UPDATE_CONSENSUS: &str = "UpdateConsensusInformation";

/// The well-known account consensus transactions are addressed to.
pub fn consensus_account_id() -> Address {
    sha256(b"helix.consensus")
}

/// Parameters of [`METHOD_INITIALIZE_CONSENSUS`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializeConsensusParams {
    /// Round 1.
    pub first_round: Round,
    /// Round 2.
    pub second_round: Round,
}

/// Parameters of [`METHOD_PUBLISH_OUT_VALUE`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishOutValueParams {
    /// Round the commitment belongs to.
    pub round_number: u64,
    /// Hash of the producer's round secret.
    pub out_value: Hash,
    /// Signature derived from the previous round.
    pub signature: Hash,
}

/// Parameters of [`METHOD_PUBLISH_IN_VALUE`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishInValueParams {
    /// Round the reveal belongs to.
    pub round_number: u64,
    /// The revealed secret.
    pub in_value: Hash,
}

/// Parameters of [`METHOD_UPDATE_CONSENSUS`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateConsensusParams {
    /// The elected next round.
    pub next_round: Round,
}

/// Build and sign a consensus transaction from this node.
pub fn build_consensus_transaction(
    keypair: &NodeKeyPair,
    method: &str,
    params: Vec<u8>,
    sequence_number: u64,
) -> Transaction {
    let mut tx = Transaction {
        from: keypair.public_key(),
        to: consensus_account_id(),
        method: method.to_string(),
        params,
        sequence_number,
        signature: [0u8; 64],
    };
    tx.signature = keypair.sign(&tx.id());
    tx
}
