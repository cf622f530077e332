//! In-memory chain, pool, and world state.
//!
//! Backing stores for a single-process node and for tests. All of them are
//! `Mutex`-guarded plain collections; no lock is held across an await.

use crate::ports::{ChainStore, NodePool, WorldState};
use async_trait::async_trait;
use hx_block_production::{ChainHeadView, ExecutionError, ReadyTransactionPool, TransactionExecutor};
use hx_block_validation::TransactionBlockIndex;
use hx_consensus::domain::transactions::{
    consensus_account_id, InitializeConsensusParams, PublishInValueParams, PublishOutValueParams,
    UpdateConsensusParams, METHOD_INITIALIZE_CONSENSUS, METHOD_PUBLISH_IN_VALUE,
    METHOD_PUBLISH_OUT_VALUE, METHOD_UPDATE_CONSENSUS,
};
use hx_consensus::ports::{AccountStateView, RoundStore, TransactionPoolPort};
use parking_lot::Mutex;
use shared_crypto::{sha256, verify_signature};
use shared_types::{Address, Block, Hash, Round, Transaction};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, warn};

/// Append-only block list. Heights start at 1, so index `height - 1`.
#[derive(Default)]
pub struct InMemoryChainStore {
    blocks: Mutex<Vec<Block>>,
}

impl InMemoryChainStore {
    /// An empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blocks on the chain.
    pub fn len(&self) -> usize {
        self.blocks.lock().len()
    }

    /// Whether the chain holds no blocks yet.
    pub fn is_empty(&self) -> bool {
        self.blocks.lock().is_empty()
    }
}

#[async_trait]
impl ChainStore for InMemoryChainStore {
    async fn head(&self) -> (u64, Hash) {
        let blocks = self.blocks.lock();
        match blocks.last() {
            Some(block) => (block.height(), block.hash()),
            None => (0, [0u8; 32]),
        }
    }

    async fn block_at_height(&self, height: u64) -> Option<Block> {
        if height == 0 {
            return None;
        }
        self.blocks.lock().get(height as usize - 1).cloned()
    }

    async fn append(&self, block: Block) {
        self.blocks.lock().push(block);
    }

    async fn truncate_above(&self, height: u64) -> Vec<Block> {
        let mut blocks = self.blocks.lock();
        if blocks.len() as u64 <= height {
            return Vec::new();
        }
        let mut removed = blocks.split_off(height as usize);
        removed.reverse();
        removed
    }
}

#[async_trait]
impl ChainHeadView for InMemoryChainStore {
    async fn head(&self) -> (u64, Hash) {
        ChainStore::head(self).await
    }
}

/// Pending transaction pool, insertion-ordered.
#[derive(Default)]
pub struct InMemoryPool {
    pending: Mutex<Vec<Transaction>>,
}

impl InMemoryPool {
    /// An empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pending transactions.
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    fn contains(pending: &[Transaction], id: &Hash) -> bool {
        pending.iter().any(|tx| &tx.id() == id)
    }

    /// The next sequence number implied by this account's pooled
    /// transactions.
    pub fn next_sequence_for(&self, account: &Address) -> Option<u64> {
        self.pending
            .lock()
            .iter()
            .filter(|tx| &tx.from == account)
            .map(|tx| tx.sequence_number + 1)
            .max()
    }
}

#[async_trait]
impl NodePool for InMemoryPool {
    async fn insert(&self, tx: Transaction) -> bool {
        let mut pending = self.pending.lock();
        if Self::contains(&pending, &tx.id()) {
            return false;
        }
        pending.push(tx);
        true
    }

    async fn get(&self, id: &Hash) -> Option<Transaction> {
        self.pending.lock().iter().find(|tx| &tx.id() == id).cloned()
    }

    async fn remove(&self, ids: &[Hash]) {
        let remove: HashSet<&Hash> = ids.iter().collect();
        self.pending.lock().retain(|tx| !remove.contains(&tx.id()));
    }

    async fn return_transactions(&self, txs: Vec<Transaction>) {
        let mut pending = self.pending.lock();
        for tx in txs {
            if !Self::contains(&pending, &tx.id()) {
                pending.push(tx);
            }
        }
    }
}

#[async_trait]
impl ReadyTransactionPool for InMemoryPool {
    async fn select_ready(&self, limit: usize) -> Vec<Transaction> {
        self.pending.lock().iter().take(limit).cloned().collect()
    }
}

/// A block a committed height remembers, for rollback.
struct CommittedEntry {
    block_hash: Hash,
    txs: Vec<Transaction>,
    rounds_added: Vec<u64>,
    round_cursor_before: u64,
}

#[derive(Default)]
struct WorldStateInner {
    /// tx id -> (containing block hash, height).
    tx_index: HashMap<Hash, (Hash, u64)>,
    committed: BTreeMap<u64, CommittedEntry>,
    /// Next expected sequence per account. Not rewound on rollback; pool
    /// admission tolerates gaps.
    sequences: HashMap<Address, u64>,
    rounds: BTreeMap<u64, Round>,
    /// The round the schedule is currently in. Initialization publishes two
    /// rounds but the chain starts in the first; only
    /// `UpdateConsensusInformation` moves this cursor forward.
    current_round_number: u64,
    branch_tip: Hash,
}

/// In-memory world state: the transaction-block index, account sequences,
/// and the round state derived from executed consensus transactions.
#[derive(Default)]
pub struct InMemoryWorldState {
    inner: Mutex<WorldStateInner>,
}

impl InMemoryWorldState {
    /// Empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current branch tip cursor.
    pub fn branch_tip(&self) -> Hash {
        self.inner.lock().branch_tip
    }

    fn apply_consensus_tx(
        inner: &mut WorldStateInner,
        tx: &Transaction,
        rounds_added: &mut Vec<u64>,
    ) -> Result<(), bincode::Error> {
        match tx.method.as_str() {
            METHOD_INITIALIZE_CONSENSUS => {
                let params: InitializeConsensusParams = bincode::deserialize(&tx.params)?;
                inner.current_round_number = params.first_round.round_number;
                for round in [params.first_round, params.second_round] {
                    debug!("[hx-node] Round {} initialized", round.round_number);
                    rounds_added.push(round.round_number);
                    inner.rounds.insert(round.round_number, round);
                }
            }
            METHOD_PUBLISH_OUT_VALUE => {
                let params: PublishOutValueParams = bincode::deserialize(&tx.params)?;
                if let Some(round) = inner.rounds.get_mut(&params.round_number) {
                    if let Some(info) = round.producer_mut(&tx.from) {
                        info.out_value = Some(params.out_value);
                        info.signature = Some(params.signature);
                    }
                }
            }
            METHOD_PUBLISH_IN_VALUE => {
                let params: PublishInValueParams = bincode::deserialize(&tx.params)?;
                if let Some(round) = inner.rounds.get_mut(&params.round_number) {
                    if let Some(info) = round.producer_mut(&tx.from) {
                        match info.out_value {
                            // A reveal must open the published commitment.
                            Some(out) if out != sha256(&params.in_value) => {
                                warn!(
                                    "[hx-node] Reveal from {} does not open its commitment, ignored",
                                    hex::encode(&tx.from[..8])
                                );
                            }
                            _ => info.in_value = Some(params.in_value),
                        }
                    }
                }
            }
            METHOD_UPDATE_CONSENSUS => {
                let params: UpdateConsensusParams = bincode::deserialize(&tx.params)?;
                let round = params.next_round;
                debug!("[hx-node] Round {} published", round.round_number);
                rounds_added.push(round.round_number);
                inner.current_round_number = round.round_number;
                inner.rounds.insert(round.round_number, round);
            }
            other => {
                debug!("[hx-node] Unknown consensus method {other}, ignored");
            }
        }
        Ok(())
    }
}

#[async_trait]
impl WorldState for InMemoryWorldState {
    async fn apply_block(
        &self,
        block: &Block,
        txs: &[Transaction],
    ) -> Result<Vec<Hash>, ExecutionError> {
        let block_hash = block.hash();
        let height = block.height();
        let mut inner = self.inner.lock();
        let round_cursor_before = inner.current_round_number;
        let mut rounds_added = Vec::new();
        let mut executed = Vec::with_capacity(txs.len());

        for tx in txs {
            if tx.to == consensus_account_id() {
                Self::apply_consensus_tx(&mut inner, tx, &mut rounds_added).map_err(|err| {
                    ExecutionError {
                        parent: block.header.previous_block_hash,
                        reason: format!("consensus parameter decode failed: {err}"),
                    }
                })?;
            }
            let next = inner.sequences.entry(tx.from).or_insert(0);
            *next = (*next).max(tx.sequence_number + 1);
            inner.tx_index.insert(tx.id(), (block_hash, height));
            executed.push(tx.id());
        }

        inner.committed.insert(
            height,
            CommittedEntry {
                block_hash,
                txs: txs.to_vec(),
                rounds_added,
                round_cursor_before,
            },
        );
        inner.branch_tip = block_hash;
        Ok(executed)
    }

    async fn rollback_to_height(&self, height: u64) -> Vec<Transaction> {
        let mut inner = self.inner.lock();
        let removed = inner.committed.split_off(&(height + 1));
        // The cursor rewinds to where it stood before the lowest unwound
        // block applied.
        if let Some(entry) = removed.values().next() {
            inner.current_round_number = entry.round_cursor_before;
        }
        let mut invalidated = Vec::new();
        for (h, entry) in removed {
            debug!(
                "[hx-node] Rolling back block {} at height {h}",
                hex::encode(&entry.block_hash[..8])
            );
            for round_number in entry.rounds_added {
                inner.rounds.remove(&round_number);
            }
            for tx in entry.txs {
                inner.tx_index.remove(&tx.id());
                invalidated.push(tx);
            }
        }
        invalidated
    }

    async fn committed_transaction(&self, id: &Hash) -> Option<Transaction> {
        let inner = self.inner.lock();
        let (_, height) = inner.tx_index.get(id)?;
        inner
            .committed
            .get(height)?
            .txs
            .iter()
            .find(|tx| &tx.id() == id)
            .cloned()
    }

    async fn set_branch_tip(&self, hash: Hash) {
        self.inner.lock().branch_tip = hash;
    }
}

#[async_trait]
impl AccountStateView for InMemoryWorldState {
    async fn persisted_sequence(&self, account: &Address) -> u64 {
        self.inner.lock().sequences.get(account).copied().unwrap_or(0)
    }
}

#[async_trait]
impl RoundStore for InMemoryWorldState {
    async fn current_round(&self) -> Option<Round> {
        let inner = self.inner.lock();
        inner.rounds.get(&inner.current_round_number).cloned()
    }

    async fn round(&self, number: u64) -> Option<Round> {
        self.inner.lock().rounds.get(&number).cloned()
    }
}

#[async_trait]
impl TransactionBlockIndex for InMemoryWorldState {
    async fn block_containing(&self, tx_id: &Hash, _branch: &Hash) -> Option<Hash> {
        // Single-branch store: the index covers the canonical chain only.
        self.inner.lock().tx_index.get(tx_id).map(|(hash, _)| *hash)
    }
}

/// Stateless execution used by the miner.
///
/// Mining must not mutate world state (the commit path does that once, for
/// mined and received blocks alike), so the miner's executor only checks
/// that the candidate set is well-formed.
#[derive(Default)]
pub struct DryRunExecutor;

impl DryRunExecutor {
    /// A new dry-run executor.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TransactionExecutor for DryRunExecutor {
    async fn execute(
        &self,
        parent: &Hash,
        txs: &[Transaction],
    ) -> Result<Vec<Hash>, ExecutionError> {
        let mut ids = Vec::with_capacity(txs.len());
        let mut seen = HashSet::with_capacity(txs.len());
        for tx in txs {
            let id = tx.id();
            if !seen.insert(id) {
                return Err(ExecutionError {
                    parent: *parent,
                    reason: format!("duplicate transaction {}", hex::encode(&id[..8])),
                });
            }
            verify_signature(&tx.from, &id, &tx.signature).map_err(|_| ExecutionError {
                parent: *parent,
                reason: format!("bad signature on transaction {}", hex::encode(&id[..8])),
            })?;
            ids.push(id);
        }
        Ok(ids)
    }
}

/// Glue for the consensus engine's pool port lives in
/// [`crate::adapters::consensus`]; the plain pool also serves callers that
/// do not gossip.
#[async_trait]
impl TransactionPoolPort for InMemoryPool {
    async fn submit(&self, tx: Transaction) -> bool {
        NodePool::insert(self, tx).await
    }

    async fn next_sequence(&self, account: &Address) -> Option<u64> {
        self.next_sequence_for(account)
    }

    async fn pending_count(&self) -> usize {
        self.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_crypto::NodeKeyPair;
    use shared_types::{BlockBody, BlockHeader};

    fn block_at(height: u64, prev: Hash, tx_ids: Vec<Hash>) -> Block {
        Block {
            header: BlockHeader {
                version: 1,
                chain_id: 1,
                height,
                previous_block_hash: prev,
                merkle_root: [0u8; 32],
                timestamp_ms: 1_000 * height,
                producer: [1u8; 32],
                signature: [0u8; 64],
            },
            body: BlockBody {
                transaction_ids: tx_ids,
            },
        }
    }

    fn signed_tx(keypair: &NodeKeyPair, method: &str, params: Vec<u8>, seq: u64) -> Transaction {
        let mut tx = Transaction {
            from: keypair.public_key(),
            to: consensus_account_id(),
            method: method.to_string(),
            params,
            sequence_number: seq,
            signature: [0u8; 64],
        };
        tx.signature = keypair.sign(&tx.id());
        tx
    }

    #[tokio::test]
    async fn test_chain_store_head_and_truncate() {
        let chain = InMemoryChainStore::new();
        assert_eq!(ChainStore::head(&chain).await, (0, [0u8; 32]));

        let b1 = block_at(1, [0u8; 32], vec![[1u8; 32]]);
        let b2 = block_at(2, b1.hash(), vec![[2u8; 32]]);
        chain.append(b1.clone()).await;
        chain.append(b2.clone()).await;
        assert_eq!(ChainStore::head(&chain).await, (2, b2.hash()));
        assert_eq!(chain.block_at_height(1).await.unwrap().hash(), b1.hash());

        let removed = chain.truncate_above(1).await;
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].hash(), b2.hash());
        assert_eq!(ChainStore::head(&chain).await, (1, b1.hash()));
    }

    #[tokio::test]
    async fn test_pool_insert_is_idempotent() {
        let pool = InMemoryPool::new();
        let keypair = NodeKeyPair::generate();
        let tx = signed_tx(&keypair, "Transfer", vec![1], 0);

        assert!(pool.insert(tx.clone()).await);
        assert!(!pool.insert(tx.clone()).await);
        assert_eq!(pool.len(), 1);

        pool.remove(&[tx.id()]).await;
        assert!(pool.is_empty());
    }

    #[tokio::test]
    async fn test_world_state_applies_round_initialization() {
        let world = InMemoryWorldState::new();
        let keypair = NodeKeyPair::generate();
        let (first, second) = hx_consensus::domain::round_math::generate_first_rounds(
            &[keypair.public_key(), [9u8; 32]],
            4_000,
            1_000,
        )
        .unwrap();
        let params = bincode::serialize(&InitializeConsensusParams {
            first_round: first,
            second_round: second,
        })
        .unwrap();
        let tx = signed_tx(&keypair, METHOD_INITIALIZE_CONSENSUS, params, 0);
        let block = block_at(1, [0u8; 32], vec![tx.id()]);

        let executed = world.apply_block(&block, &[tx.clone()]).await.unwrap();
        assert_eq!(executed, vec![tx.id()]);

        // Two rounds are stored, but the chain starts in round one.
        let current = RoundStore::current_round(&world).await.unwrap();
        assert_eq!(current.round_number, 1);
        assert!(RoundStore::round(&world, 2).await.is_some());
        assert_eq!(world.persisted_sequence(&keypair.public_key()).await, 1);
        assert_eq!(
            world.block_containing(&tx.id(), &[0u8; 32]).await,
            Some(block.hash())
        );
    }

    #[tokio::test]
    async fn test_round_cursor_advances_with_updates_and_rewinds_on_rollback() {
        let world = InMemoryWorldState::new();
        let keypair = NodeKeyPair::generate();
        let (first, second) = hx_consensus::domain::round_math::generate_first_rounds(
            &[keypair.public_key()],
            4_000,
            1_000,
        )
        .unwrap();
        let elected = hx_consensus::domain::round_math::elect_next_round(&first).unwrap();

        let init = signed_tx(
            &keypair,
            METHOD_INITIALIZE_CONSENSUS,
            bincode::serialize(&InitializeConsensusParams {
                first_round: first,
                second_round: second,
            })
            .unwrap(),
            0,
        );
        let b1 = block_at(1, [0u8; 32], vec![init.id()]);
        world.apply_block(&b1, &[init]).await.unwrap();
        let current = RoundStore::current_round(&world).await.unwrap();
        assert_eq!(current.round_number, 1);

        let update = signed_tx(
            &keypair,
            METHOD_UPDATE_CONSENSUS,
            bincode::serialize(&UpdateConsensusParams {
                next_round: elected,
            })
            .unwrap(),
            1,
        );
        let b2 = block_at(2, b1.hash(), vec![update.id()]);
        world.apply_block(&b2, &[update]).await.unwrap();
        let current = RoundStore::current_round(&world).await.unwrap();
        assert_eq!(current.round_number, 2);

        // Unwinding the block that advanced the round puts us back in it.
        world.rollback_to_height(1).await;
        let current = RoundStore::current_round(&world).await.unwrap();
        assert_eq!(current.round_number, 1);
    }

    #[tokio::test]
    async fn test_rollback_returns_transactions_and_rounds() {
        let world = InMemoryWorldState::new();
        let keypair = NodeKeyPair::generate();
        let (first, second) = hx_consensus::domain::round_math::generate_first_rounds(
            &[keypair.public_key()],
            4_000,
            1_000,
        )
        .unwrap();
        let params = bincode::serialize(&InitializeConsensusParams {
            first_round: first,
            second_round: second,
        })
        .unwrap();
        let tx1 = signed_tx(&keypair, METHOD_INITIALIZE_CONSENSUS, params, 0);
        let b1 = block_at(1, [0u8; 32], vec![tx1.id()]);
        world.apply_block(&b1, &[tx1.clone()]).await.unwrap();

        let tx2 = signed_tx(&keypair, "Transfer", vec![2], 1);
        let b2 = block_at(2, b1.hash(), vec![tx2.id()]);
        world.apply_block(&b2, &[tx2.clone()]).await.unwrap();

        let invalidated = world.rollback_to_height(1).await;
        assert_eq!(invalidated.len(), 1);
        assert_eq!(invalidated[0].id(), tx2.id());
        // Block 1's effects survive.
        assert!(RoundStore::current_round(&world).await.is_some());
        assert!(world.block_containing(&tx1.id(), &[0u8; 32]).await.is_some());
        assert!(world.block_containing(&tx2.id(), &[0u8; 32]).await.is_none());
        assert!(world.committed_transaction(&tx1.id()).await.is_some());
        assert!(world.committed_transaction(&tx2.id()).await.is_none());
    }

    #[tokio::test]
    async fn test_mismatched_reveal_is_ignored() {
        let world = InMemoryWorldState::new();
        let keypair = NodeKeyPair::generate();
        let me = keypair.public_key();
        let (first, second) =
            hx_consensus::domain::round_math::generate_first_rounds(&[me], 4_000, 1_000).unwrap();
        let init = signed_tx(
            &keypair,
            METHOD_INITIALIZE_CONSENSUS,
            bincode::serialize(&InitializeConsensusParams {
                first_round: first,
                second_round: second,
            })
            .unwrap(),
            0,
        );
        let secret = [5u8; 32];
        let out = signed_tx(
            &keypair,
            METHOD_PUBLISH_OUT_VALUE,
            bincode::serialize(&PublishOutValueParams {
                round_number: 1,
                out_value: sha256(&secret),
                signature: [1u8; 32],
            })
            .unwrap(),
            1,
        );
        let bad_reveal = signed_tx(
            &keypair,
            METHOD_PUBLISH_IN_VALUE,
            bincode::serialize(&PublishInValueParams {
                round_number: 1,
                in_value: [9u8; 32],
            })
            .unwrap(),
            2,
        );
        let txs = vec![init, out, bad_reveal];
        let block = block_at(1, [0u8; 32], txs.iter().map(|t| t.id()).collect());
        world.apply_block(&block, &txs).await.unwrap();

        let round = RoundStore::round(&world, 1).await.unwrap();
        let info = round.producer(&me).unwrap();
        assert_eq!(info.out_value, Some(sha256(&secret)));
        assert!(info.in_value.is_none());
    }

    #[tokio::test]
    async fn test_dry_run_rejects_bad_signature() {
        let executor = DryRunExecutor::new();
        let keypair = NodeKeyPair::generate();
        let mut tx = signed_tx(&keypair, "Transfer", vec![1], 0);
        tx.signature = [9u8; 64];
        assert!(executor.execute(&[0u8; 32], &[tx]).await.is_err());
    }
}
