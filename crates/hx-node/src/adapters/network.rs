//! Channel-backed network adapter.
//!
//! Peers are bounded mpsc senders into each other's inbound queues. The
//! real transport would sit behind the same port; the core never learns the
//! difference.

use crate::ports::NetworkPort;
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{InboundEnvelope, NetworkMessage, NodeId};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::debug;

/// In-process network of mpsc channels.
pub struct ChannelNetwork {
    local: NodeId,
    peers: Mutex<HashMap<NodeId, mpsc::Sender<InboundEnvelope>>>,
}

impl ChannelNetwork {
    /// A network with no peers yet.
    pub fn new(local: NodeId) -> Self {
        Self {
            local,
            peers: Mutex::new(HashMap::new()),
        }
    }

    /// This node's id.
    pub fn local_id(&self) -> NodeId {
        self.local
    }

    /// Attach a peer's inbound queue.
    pub fn connect(&self, peer: NodeId, sender: mpsc::Sender<InboundEnvelope>) {
        self.peers.lock().insert(peer, sender);
    }

    /// Detach a peer.
    pub fn disconnect(&self, peer: &NodeId) {
        self.peers.lock().remove(peer);
    }

    fn snapshot(&self) -> Vec<(NodeId, mpsc::Sender<InboundEnvelope>)> {
        self.peers
            .lock()
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect()
    }
}

#[async_trait]
impl NetworkPort for ChannelNetwork {
    async fn broadcast(&self, message: NetworkMessage) {
        for (peer, sender) in self.snapshot() {
            let envelope = InboundEnvelope {
                peer: self.local,
                message: message.clone(),
            };
            if sender.send(envelope).await.is_err() {
                debug!("[hx-node] Peer {} queue closed, dropping", hex::encode(&peer.0[..8]));
            }
        }
    }

    async fn send_to(&self, peer: &NodeId, message: NetworkMessage) {
        let sender = self.peers.lock().get(peer).cloned();
        if let Some(sender) = sender {
            let envelope = InboundEnvelope {
                peer: self.local,
                message,
            };
            if sender.send(envelope).await.is_err() {
                debug!(
                    "[hx-node] Peer {} queue closed, dropping",
                    hex::encode(&peer.0[..8])
                );
            }
        }
    }
}
