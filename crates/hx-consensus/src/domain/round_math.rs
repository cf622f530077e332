//! Round generation, signature derivation, and next-round election.
//!
//! All derivations are deterministic SHA-256 folds, so every node that has
//! the same round state elects the same next round.

use shared_crypto::sha256_concat;
use shared_types::{Hash, ProducerInfo, PublicKey, Round};

/// Generate the first two rounds of a fresh chain.
///
/// Both rounds cover the full producer set. Orders are derived from a seed
/// folded over the producer keys, so every node configured with the same
/// set computes identical rounds. Returns `None` for an empty set.
pub fn generate_first_rounds(
    producers: &[PublicKey],
    mining_interval_ms: u64,
    now_ms: u64,
) -> Option<(Round, Round)> {
    if producers.is_empty() {
        return None;
    }

    let parts: Vec<&[u8]> = producers.iter().map(|p| p.as_slice()).collect();
    let seed_one = sha256_concat(&parts);
    let seed_two = sha256_concat(&[&seed_one, b"round-two"]);

    let order_one = ordered_by_seed(&seed_one, producers);
    let extra_one = pick_extra(&seed_one, &order_one)?;
    let first = build_round(1, &order_one, extra_one, now_ms, mining_interval_ms);

    let order_two = ordered_by_seed(&seed_two, producers);
    let extra_two = pick_extra(&seed_two, &order_two)?;
    let second = build_round(
        2,
        &order_two,
        extra_two,
        first.extra_block_time_slot_ms,
        mining_interval_ms,
    );

    Some((first, second))
}

/// Derive a producer's round signature from its secret and the previous
/// round's merged signatures.
pub fn calculate_signature(previous_round: &Round, secret: &Hash) -> Hash {
    let mut parts: Vec<&[u8]> = vec![secret];
    for producer in &previous_round.producers {
        if let Some(signature) = &producer.signature {
            parts.push(signature);
        }
    }
    sha256_concat(&parts)
}

/// Elect the next round from the current one.
///
/// The seed folds each producer's revealed secret (falling back to the
/// commitment when unrevealed) and the round number. Producer order and the
/// extra-block slot holder both derive from the seed; the next round's
/// slots open after the current round's extra-block slot. Returns `None`
/// for a round with no producers.
pub fn elect_next_round(current: &Round) -> Option<Round> {
    if current.producers.is_empty() {
        return None;
    }

    let round_bytes = current.round_number.to_le_bytes();
    let mut parts: Vec<&[u8]> = Vec::with_capacity(current.producers.len() + 1);
    for producer in &current.producers {
        if let Some(value) = producer.in_value.as_ref().or(producer.out_value.as_ref()) {
            parts.push(value);
        }
    }
    parts.push(&round_bytes);
    let seed = sha256_concat(&parts);

    let keys: Vec<PublicKey> = current.producers.iter().map(|p| p.address).collect();
    let order = ordered_by_seed(&seed, &keys);
    let extra = pick_extra(&seed, &order)?;

    Some(build_round(
        current.round_number + 1,
        &order,
        extra,
        current.extra_block_time_slot_ms,
        current.mining_interval_ms,
    ))
}

fn build_round(
    round_number: u64,
    order: &[PublicKey],
    extra_block_producer: PublicKey,
    base_ms: u64,
    mining_interval_ms: u64,
) -> Round {
    let producers = order
        .iter()
        .enumerate()
        .map(|(i, address)| {
            ProducerInfo::new(
                *address,
                i as u32,
                base_ms + (i as u64 + 1) * mining_interval_ms,
            )
        })
        .collect::<Vec<_>>();
    let extra_block_time_slot_ms = base_ms + (order.len() as u64 + 1) * mining_interval_ms;
    Round {
        round_number,
        producers,
        extra_block_producer,
        extra_block_time_slot_ms,
        mining_interval_ms,
    }
}

fn ordered_by_seed(seed: &Hash, producers: &[PublicKey]) -> Vec<PublicKey> {
    let mut keyed: Vec<(Hash, PublicKey)> = producers
        .iter()
        .map(|p| (sha256_concat(&[seed, p]), *p))
        .collect();
    keyed.sort();
    keyed.into_iter().map(|(_, p)| p).collect()
}

fn pick_extra(seed: &Hash, producers: &[PublicKey]) -> Option<PublicKey> {
    if producers.is_empty() {
        return None;
    }
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&seed[..8]);
    let index = (u64::from_le_bytes(bytes) % producers.len() as u64) as usize;
    Some(producers[index])
}
