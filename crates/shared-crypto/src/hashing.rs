//! # SHA-256 Hashing
//!
//! All chain identities (block hashes, transaction ids, merkle roots, round
//! seeds) are SHA-256 digests.

use shared_types::Hash;
use sha2::{Digest, Sha256};

/// Hash a byte slice.
pub fn sha256(bytes: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// Hash the concatenation of several byte slices.
pub fn sha256_concat(parts: &[&[u8]]) -> Hash {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Hash an ordered pair of hashes (merkle interior node).
pub fn hash_pair(left: &Hash, right: &Hash) -> Hash {
    sha256_concat(&[left, right])
}

/// Merkle root over a list of leaf hashes.
///
/// An odd leaf at any level is paired with itself. An empty list yields the
/// zero hash (only the genesis bootstrap ever sees this case).
pub fn merkle_root(leaves: &[Hash]) -> Hash {
    if leaves.is_empty() {
        return [0u8; 32];
    }
    let mut level: Vec<Hash> = leaves.to_vec();
    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        for pair in level.chunks(2) {
            let right = pair.get(1).unwrap_or(&pair[0]);
            next.push(hash_pair(&pair[0], right));
        }
        level = next;
    }
    level[0]
}
