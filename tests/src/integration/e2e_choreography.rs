//! # End-to-End Choreography Tests
//!
//! Full-runtime scenarios: every node is a complete [`NodeRuntime`] (engine,
//! miner, validation pipeline, commit controller, message loop) and nodes
//! talk only through the channel network.
//!
//! ```text
//! [Engine] ──submit──→ [Pool] ──gossip──→ peers
//!     │
//!   slot timer
//!     ↓
//! [Miner] ──block──→ [Commit Controller] ──broadcast──→ peers
//!                          │                               │
//!                    commit hook                     commit controller
//!                          ↓                               ↓
//!                    [Engine] re-driven             peer chain advances
//! ```
//!
//! ## Test Categories
//!
//! 1. **Bootstrap**: a generator seeds the first two rounds and mines the
//!    genesis-successor block from them.
//! 2. **Convergence**: a follower commits the generator's blocks and starts
//!    scheduling its own slots.
//! 3. **User flow**: a transaction submitted at one node ends up in a block
//!    on every node.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use hx_consensus::ConsensusMode;
    use hx_node::{NodeConfig, NodeRuntime, RunningNode};
    use shared_crypto::NodeKeyPair;
    use shared_types::{NodeId, Transaction};

    const CHAIN_ID: u32 = 7;
    const INTERVAL_MS: u64 = 400;

    fn delegated_config(producers: &[NodeKeyPair], is_generator: bool) -> NodeConfig {
        let mut config = NodeConfig::default();
        config.chain.chain_id = CHAIN_ID;
        config.consensus.mining_interval_ms = INTERVAL_MS;
        config.consensus.is_generator = is_generator;
        config.consensus.producers = producers.iter().map(|kp| kp.public_key()).collect();
        config
    }

    fn connect(a: &RunningNode, b: &RunningNode) {
        a.network.connect(b.network.local_id(), b.inbound.clone());
        b.network.connect(a.network.local_id(), a.inbound.clone());
    }

    fn signed_tx(keypair: &NodeKeyPair, seq: u64) -> Transaction {
        let mut tx = Transaction {
            from: keypair.public_key(),
            to: [2u8; 32],
            method: "Transfer".to_string(),
            params: vec![seq as u8],
            sequence_number: seq,
            signature: [0u8; 64],
        };
        tx.signature = keypair.sign(&tx.id());
        tx
    }

    // =========================================================================
    // BOOTSTRAP
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_generator_bootstrap_mines_round_initialization() {
        let keypair = NodeKeyPair::from_seed([1u8; 32]);
        let config = delegated_config(std::slice::from_ref(&keypair), true);
        let node = NodeRuntime::build(&config, NodeKeyPair::from_seed([1u8; 32])).start();

        tokio::time::sleep(Duration::from_millis(INTERVAL_MS)).await;

        // The round-initialization transaction was packaged and committed.
        let (height, _) = node.handle.head().await;
        assert!(height >= 1, "bootstrap block was not committed");
        let block = node.handle.get_block_at_height(1).await.unwrap();
        assert_eq!(block.body.transactions_count(), 1);
        assert_eq!(block.header.producer, keypair.public_key());

        // Committing it re-drove the engine into the first round.
        let metrics = node.engine.metrics();
        assert!(metrics.rounds_scheduled >= 1);
        assert!(metrics.timers_armed >= 1);

        node.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_generator_does_not_bootstrap() {
        let keypair = NodeKeyPair::from_seed([1u8; 32]);
        let config = delegated_config(std::slice::from_ref(&keypair), false);
        let node = NodeRuntime::build(&config, NodeKeyPair::from_seed([1u8; 32])).start();

        tokio::time::sleep(Duration::from_millis(3 * INTERVAL_MS)).await;

        assert_eq!(node.handle.head().await.0, 0);
        assert_eq!(node.engine.metrics().rounds_scheduled, 0);

        node.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_generator_keeps_producing_through_its_slots() {
        let keypair = NodeKeyPair::from_seed([1u8; 32]);
        let config = delegated_config(std::slice::from_ref(&keypair), true);
        let node = NodeRuntime::build(&config, NodeKeyPair::from_seed([1u8; 32])).start();

        // Enough paused time for the bootstrap block plus at least one
        // commit-reveal slot of round one.
        tokio::time::sleep(Duration::from_millis(6 * INTERVAL_MS)).await;

        let (height, _) = node.handle.head().await;
        assert!(height >= 2, "no slot block after bootstrap, head {height}");

        node.shutdown();
    }

    // =========================================================================
    // CONVERGENCE
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_follower_converges_on_generator_chain() {
        let gen_key = NodeKeyPair::from_seed([1u8; 32]);
        let fol_key = NodeKeyPair::from_seed([2u8; 32]);
        let producers = [
            NodeKeyPair::from_seed([1u8; 32]),
            NodeKeyPair::from_seed([2u8; 32]),
        ];

        let generator =
            NodeRuntime::build(&delegated_config(&producers, true), gen_key).start();
        let follower =
            NodeRuntime::build(&delegated_config(&producers, false), fol_key).start();
        connect(&generator, &follower);

        tokio::time::sleep(Duration::from_millis(2 * INTERVAL_MS)).await;

        // The bootstrap block was gossiped and committed on both sides.
        let gen_block = generator.handle.get_block_at_height(1).await.unwrap();
        let fol_block = follower.handle.get_block_at_height(1).await.unwrap();
        assert_eq!(gen_block.hash(), fol_block.hash());

        // Committing it put the follower into the same round schedule.
        assert!(follower.engine.metrics().rounds_scheduled >= 1);

        generator.shutdown();
        follower.shutdown();
    }

    // =========================================================================
    // USER FLOW
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_submitted_transaction_lands_in_a_block_on_every_node() {
        let producer_key = NodeKeyPair::from_seed([1u8; 32]);

        let mut producer_config = NodeConfig::default();
        producer_config.chain.chain_id = CHAIN_ID;
        producer_config.consensus.mode = ConsensusMode::SingleNode {
            interval_ms: INTERVAL_MS,
        };

        let mut observer_config = NodeConfig::default();
        observer_config.chain.chain_id = CHAIN_ID;

        let producer = NodeRuntime::build(&producer_config, producer_key).start();
        let observer =
            NodeRuntime::build(&observer_config, NodeKeyPair::from_seed([2u8; 32])).start();
        connect(&producer, &observer);

        // Submitted at the observer, gossiped to the producer.
        let user = NodeKeyPair::generate();
        let tx = signed_tx(&user, 0);
        assert!(observer
            .handle
            .broadcast_transaction(tx.clone())
            .await
            .unwrap());

        tokio::time::sleep(Duration::from_millis(4 * INTERVAL_MS)).await;

        for node in [&producer, &observer] {
            let (height, _) = node.handle.head().await;
            assert!(height >= 1, "no block reached this node");
            let block = node.handle.get_block_at_height(1).await.unwrap();
            assert!(block.body.transaction_ids.contains(&tx.id()));
            assert!(node.handle.get_transaction(&tx.id()).await.is_none());
        }

        producer.shutdown();
        observer.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_joiner_catches_up_block_by_block() {
        let producer_key = NodeKeyPair::from_seed([1u8; 32]);

        let mut producer_config = NodeConfig::default();
        producer_config.chain.chain_id = CHAIN_ID;
        producer_config.consensus.mode = ConsensusMode::SingleNode {
            interval_ms: INTERVAL_MS,
        };
        let producer = NodeRuntime::build(&producer_config, producer_key).start();

        // Two blocks mined while the joiner is offline.
        let user = NodeKeyPair::generate();
        for seq in 0..2u64 {
            producer
                .handle
                .broadcast_transaction(signed_tx(&user, seq))
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(2 * INTERVAL_MS)).await;
        }
        let (produced, _) = producer.handle.head().await;
        assert!(produced >= 2);

        let mut joiner_config = NodeConfig::default();
        joiner_config.chain.chain_id = CHAIN_ID;
        let joiner = NodeRuntime::build(&joiner_config, NodeKeyPair::from_seed([2u8; 32])).start();
        connect(&producer, &joiner);

        // The next produced block is ahead of the joiner's empty chain, so
        // the joiner walks the gap with block requests.
        producer
            .handle
            .broadcast_transaction(signed_tx(&user, 2))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(8 * INTERVAL_MS)).await;

        let (caught_up, _) = joiner.handle.head().await;
        assert!(
            caught_up >= produced,
            "joiner stuck at {caught_up}, producer was at {produced}"
        );

        producer.shutdown();
        joiner.shutdown();
    }
}
