//! # Message-Loop Flow Tests
//!
//! Exercises the node's inbound message loop across crate boundaries with
//! real wiring (in-memory stores, channel network) and externally crafted
//! peers:
//!
//! 1. **Gossip**: transactions broadcast on one node land in a connected
//!    peer's pool.
//! 2. **Catch-up**: a block ahead of the local head triggers a
//!    `RequestBlock` for the first attachable height, and the chain catches
//!    up once the gap is filled.
//! 3. **Branch switch**: a competing block at a committed height replaces
//!    the head only when its timestamp is older, and the displaced
//!    transactions return to the pool.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc;
    use tokio_test::assert_ok;

    use hx_node::{NodeConfig, NodeRuntime};
    use shared_crypto::{merkle_root, NodeKeyPair};
    use shared_types::{
        Block, BlockBody, BlockHeader, Hash, InboundEnvelope, NetworkMessage, NodeId, Transaction,
    };

    const CHAIN_ID: u32 = 7;

    /// A node with an inert consensus engine: not a generator, empty
    /// producer set, so only the message loop does any work.
    fn passive_node(seed: u8) -> hx_node::RunningNode {
        let mut config = NodeConfig::default();
        config.chain.chain_id = CHAIN_ID;
        NodeRuntime::build(&config, NodeKeyPair::from_seed([seed; 32])).start()
    }

    fn now_ms() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_millis() as u64
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

    fn signed_block(
        keypair: &NodeKeyPair,
        height: u64,
        prev: Hash,
        timestamp_ms: u64,
        txs: &[Transaction],
    ) -> Block {
        let ids: Vec<Hash> = txs.iter().map(|tx| tx.id()).collect();
        let mut header = BlockHeader {
            version: 1,
            chain_id: CHAIN_ID,
            height,
            previous_block_hash: prev,
            merkle_root: merkle_root(&ids),
            timestamp_ms,
            producer: keypair.public_key(),
            signature: [0u8; 64],
        };
        header.signature = keypair.sign(&header.hash());
        Block {
            header,
            body: BlockBody {
                transaction_ids: ids,
            },
        }
    }

    fn block_message(block: &Block) -> NetworkMessage {
        NetworkMessage::Block {
            bytes: bincode::serialize(block).unwrap(),
        }
    }

    async fn send_from(node: &hx_node::RunningNode, peer: NodeId, message: NetworkMessage) {
        node.inbound
            .send(InboundEnvelope { peer, message })
            .await
            .unwrap();
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    // =========================================================================
    // GOSSIP
    // =========================================================================

    #[tokio::test]
    async fn test_transaction_gossip_reaches_connected_peer() {
        let node_a = passive_node(1);
        let node_b = passive_node(2);
        node_a
            .network
            .connect(node_b.network.local_id(), node_b.inbound.clone());
        node_b
            .network
            .connect(node_a.network.local_id(), node_a.inbound.clone());

        let tx = signed_tx(&NodeKeyPair::generate(), 0);
        assert!(assert_ok!(
            node_a.handle.broadcast_transaction(tx.clone()).await
        ));
        settle().await;

        assert!(node_b.handle.get_transaction(&tx.id()).await.is_some());

        node_a.shutdown();
        node_b.shutdown();
    }

    #[tokio::test]
    async fn test_tx_request_is_answered_to_requester() {
        let node = passive_node(1);
        let peer = NodeId([9u8; 32]);
        let (peer_tx, mut peer_rx) = mpsc::channel(4);
        node.network.connect(peer, peer_tx);

        let tx = signed_tx(&NodeKeyPair::generate(), 0);
        assert_ok!(node.handle.broadcast_transaction(tx.clone()).await);
        // The broadcast itself reaches the peer first.
        assert!(matches!(
            peer_rx.recv().await.unwrap().message,
            NetworkMessage::Tx { .. }
        ));

        send_from(&node, peer, NetworkMessage::TxRequest { tx_hash: tx.id() }).await;
        let answer = peer_rx.recv().await.unwrap();
        match answer.message {
            NetworkMessage::Tx { bytes } => {
                let got: Transaction = bincode::deserialize(&bytes).unwrap();
                assert_eq!(got.id(), tx.id());
            }
            other => panic!("expected transaction answer, got {other:?}"),
        }

        node.shutdown();
    }

    // =========================================================================
    // CATCH-UP
    // =========================================================================

    #[tokio::test]
    async fn test_block_gap_triggers_catch_up_and_fills() {
        let node = passive_node(1);
        let producer = NodeKeyPair::generate();

        // We play the remote peer by hand.
        let peer = NodeId([9u8; 32]);
        let (peer_tx, mut peer_rx) = mpsc::channel(8);
        node.network.connect(peer, peer_tx);

        let tx1 = signed_tx(&NodeKeyPair::generate(), 0);
        let tx2 = signed_tx(&NodeKeyPair::generate(), 0);
        let block1 = signed_block(&producer, 1, [0u8; 32], now_ms() - 2_000, &[tx1.clone()]);
        let block2 = signed_block(&producer, 2, block1.hash(), now_ms() - 1_000, &[tx2.clone()]);

        // The node needs the transactions before it can execute the blocks.
        for tx in [&tx1, &tx2] {
            send_from(
                &node,
                peer,
                NetworkMessage::Tx {
                    bytes: bincode::serialize(tx).unwrap(),
                },
            )
            .await;
        }

        // Block 2 arrives first: too far ahead, so the node parks it and
        // asks us for the next height it can attach.
        send_from(&node, peer, block_message(&block2)).await;
        let request = peer_rx.recv().await.unwrap();
        assert_eq!(request.message, NetworkMessage::RequestBlock { height: 1 });
        assert_eq!(node.handle.head().await.0, 0);

        // Filling the gap commits both the answer and the parked block.
        send_from(&node, peer, block_message(&block1)).await;
        settle().await;
        assert_eq!(node.handle.head().await, (2, block2.hash()));

        node.shutdown();
    }

    // =========================================================================
    // BRANCH SWITCH
    // =========================================================================

    #[tokio::test]
    async fn test_older_competing_block_replaces_head() {
        let node = passive_node(1);
        let producer = NodeKeyPair::generate();
        let peer = NodeId([9u8; 32]);

        let tx_a = signed_tx(&NodeKeyPair::generate(), 0);
        let tx_b = signed_tx(&NodeKeyPair::generate(), 0);
        assert_ok!(node.handle.broadcast_transaction(tx_a.clone()).await);
        assert_ok!(node.handle.broadcast_transaction(tx_b.clone()).await);

        let base = now_ms() - 10_000;
        let block_a = signed_block(&producer, 1, [0u8; 32], base + 5_000, &[tx_a.clone()]);
        send_from(&node, peer, block_message(&block_a)).await;
        settle().await;
        assert_eq!(node.handle.head().await, (1, block_a.hash()));
        assert!(node.handle.get_transaction(&tx_a.id()).await.is_none());

        // Same height, older timestamp: wins the slot, head switches, and
        // the displaced block's transactions return to the pool.
        let block_b = signed_block(&producer, 1, [0u8; 32], base, &[tx_b.clone()]);
        send_from(&node, peer, block_message(&block_b)).await;
        settle().await;

        assert_eq!(node.handle.head().await, (1, block_b.hash()));
        assert!(node.handle.get_transaction(&tx_a.id()).await.is_some());
        assert!(node.handle.get_transaction(&tx_b.id()).await.is_none());

        node.shutdown();
    }

    #[tokio::test]
    async fn test_newer_competing_block_is_rejected() {
        let node = passive_node(1);
        let producer = NodeKeyPair::generate();
        let peer = NodeId([9u8; 32]);

        let tx_a = signed_tx(&NodeKeyPair::generate(), 0);
        let tx_b = signed_tx(&NodeKeyPair::generate(), 0);
        assert_ok!(node.handle.broadcast_transaction(tx_a.clone()).await);
        assert_ok!(node.handle.broadcast_transaction(tx_b.clone()).await);

        let base = now_ms() - 10_000;
        let block_a = signed_block(&producer, 1, [0u8; 32], base, &[tx_a.clone()]);
        send_from(&node, peer, block_message(&block_a)).await;
        settle().await;
        assert_eq!(node.handle.head().await, (1, block_a.hash()));

        let block_c = signed_block(&producer, 1, [0u8; 32], base + 5_000, &[tx_b.clone()]);
        send_from(&node, peer, block_message(&block_c)).await;
        settle().await;

        // The later block lost the slot; nothing rolled back.
        assert_eq!(node.handle.head().await, (1, block_a.hash()));
        assert!(node.handle.get_transaction(&tx_b.id()).await.is_some());

        node.shutdown();
    }
}
