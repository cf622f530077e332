//! # Core Chain Entities
//!
//! Blocks and transactions are immutable once constructed: a block's hash is
//! a pure function of its header bytes, a transaction's identity is a pure
//! function of its content.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A 32-byte SHA-256 hash.
pub type Hash = [u8; 32];

/// A 64-byte Ed25519 signature.
pub type Signature = [u8; 64];

/// A 32-byte Ed25519 public key. Doubles as the account address.
pub type PublicKey = [u8; 32];

/// Alias used where a key identifies an account rather than a signer.
pub type Address = PublicKey;

/// The header of a block. The producer signs `hash()`, which covers every
/// field except the signature itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Protocol version for this block.
    pub version: u16,
    /// Chain identifier; blocks from other chains are rejected structurally.
    pub chain_id: u32,
    /// Block height in the chain.
    pub height: u64,
    /// Hash of the parent block (creates the chain linkage).
    pub previous_block_hash: Hash,
    /// Merkle root over the body's transaction ids.
    pub merkle_root: Hash,
    /// Unix timestamp in milliseconds when the block was produced.
    pub timestamp_ms: u64,
    /// The producer who mined this block.
    pub producer: PublicKey,
    /// Producer signature over the header hash.
    #[serde(with = "serde_signature")]
    pub signature: Signature,
}

impl BlockHeader {
    /// Compute the header hash. Pure function of the header bytes,
    /// excluding the signature.
    pub fn hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(self.version.to_le_bytes());
        hasher.update(self.chain_id.to_le_bytes());
        hasher.update(self.height.to_le_bytes());
        hasher.update(self.previous_block_hash);
        hasher.update(self.merkle_root);
        hasher.update(self.timestamp_ms.to_le_bytes());
        hasher.update(self.producer);
        hasher.finalize().into()
    }
}

/// The body of a block: the ordered set of transaction ids it packages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BlockBody {
    /// Ids of the packaged transactions, in execution order.
    pub transaction_ids: Vec<Hash>,
}

impl BlockBody {
    /// Number of transactions packaged in this block.
    pub fn transactions_count(&self) -> usize {
        self.transaction_ids.len()
    }
}

/// A block: header plus body. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// The block header.
    pub header: BlockHeader,
    /// The block body.
    pub body: BlockBody,
}

impl Block {
    /// The block hash (header hash).
    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    /// Block height shortcut.
    pub fn height(&self) -> u64 {
        self.header.height
    }
}

/// A transaction. Identity is the content hash returned by [`Transaction::id`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Sender's public key.
    pub from: PublicKey,
    /// Recipient account (a contract account for consensus transactions).
    pub to: Address,
    /// Name of the method invoked on the recipient.
    pub method: String,
    /// Encoded call parameters.
    pub params: Vec<u8>,
    /// Per-account sequence number, assigned at emission time.
    pub sequence_number: u64,
    /// Sender's signature over the transaction id.
    #[serde(with = "serde_signature")]
    pub signature: Signature,
}

impl Transaction {
    /// Compute the transaction id: the content hash, excluding the signature.
    pub fn id(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(self.from);
        hasher.update(self.to);
        hasher.update(self.method.as_bytes());
        hasher.update(&self.params);
        hasher.update(self.sequence_number.to_le_bytes());
        hasher.finalize().into()
    }

    /// Short hex rendering of the id for log lines.
    pub fn short_id(&self) -> String {
        hex::encode(&self.id()[..8])
    }
}

/// Serde helper for 64-byte signatures (no blanket array impl at that size).
mod serde_signature {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(sig: &[u8; 64], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(sig)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 64], D::Error> {
        let bytes: Vec<u8> = Deserialize::deserialize(deserializer)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("signature must be 64 bytes"))
    }
}
