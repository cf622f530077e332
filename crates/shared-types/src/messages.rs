//! # Peer Message Types
//!
//! The message *types* the core reacts to. Wire framing and peer discovery
//! live in the transport layer; the core only sees decoded envelopes drained
//! from a bounded queue by a single consumer.

use crate::entities::Hash;
use serde::{Deserialize, Serialize};

/// Unique identifier for a peer node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct NodeId(pub [u8; 32]);

/// Inbound peer message consumed by the node's processing loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkMessage {
    /// Request for the serialized block at a height; answered directly.
    RequestBlock {
        /// Height of the requested block.
        height: u64,
    },
    /// Request for a transaction by id; silently dropped when unknown.
    TxRequest {
        /// Id of the requested transaction.
        tx_hash: Hash,
    },
    /// A serialized block to feed into the commit pipeline.
    Block {
        /// Bincode-encoded block bytes.
        bytes: Vec<u8>,
    },
    /// A serialized transaction to feed into pool admission.
    Tx {
        /// Bincode-encoded transaction bytes.
        bytes: Vec<u8>,
    },
}

/// An inbound message together with its originating peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEnvelope {
    /// The peer the message arrived from.
    pub peer: NodeId,
    /// The decoded message.
    pub message: NetworkMessage,
}
