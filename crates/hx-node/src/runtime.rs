//! Node assembly.
//!
//! Builds every subsystem from one [`NodeConfig`] and wires the ports:
//! pool and chain stores are shared, the miner and commit controller share
//! the exclusion flag, and the consensus engine sits on top of both through
//! its adapters.

use crate::adapters::{
    ChannelNetwork, ConsensusPoolAdapter, DryRunExecutor, EngineCommitHook, InMemoryChainStore,
    InMemoryPool, InMemoryWorldState, NodeController, NodeEngine, ProductionAdapter,
};
use crate::config::NodeConfig;
use crate::service::{NodeHandle, NodeService};
use hx_block_production::Miner;
use hx_block_validation::{SystemTimeSource, ValidationPipeline};
use hx_consensus::ConsensusEngine;
use shared_crypto::NodeKeyPair;
use shared_types::{ExclusionFlag, InboundEnvelope, NodeId};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

/// The message loop as wired in this runtime.
pub type NodeMessageLoop = NodeService<
    InMemoryChainStore,
    InMemoryWorldState,
    InMemoryPool,
    InMemoryWorldState,
    ChannelNetwork,
>;

/// The outward surface as wired in this runtime.
pub type RuntimeHandle = NodeHandle<InMemoryChainStore, InMemoryPool, ChannelNetwork>;

/// A fully wired, not yet running node.
pub struct NodeRuntime {
    /// The consensus engine.
    pub engine: Arc<NodeEngine>,
    /// The commit controller (blocks from any source go through it).
    pub controller: Arc<NodeController>,
    /// The channel network adapter, for connecting peers.
    pub network: Arc<ChannelNetwork>,
    /// The outward node surface.
    pub handle: RuntimeHandle,
    /// Sender into this node's inbound queue (hand to peers).
    pub inbound: mpsc::Sender<InboundEnvelope>,
    service: NodeMessageLoop,
}

impl NodeRuntime {
    /// Wire a node from its configuration and signing identity.
    pub fn build(config: &NodeConfig, keypair: NodeKeyPair) -> Self {
        let keypair = Arc::new(keypair);
        let local_id = NodeId(keypair.public_key());
        info!(
            "[hx-node] Building node {} (chain {})",
            hex::encode(&local_id.0[..8]),
            config.chain.chain_id
        );

        let flag = Arc::new(ExclusionFlag::new());
        let chain = Arc::new(InMemoryChainStore::new());
        let world = Arc::new(InMemoryWorldState::new());
        let pool = Arc::new(InMemoryPool::new());
        let network = Arc::new(ChannelNetwork::new(local_id));

        let pipeline = Arc::new(ValidationPipeline::new(
            config.pipeline_config(),
            world.clone(),
            Box::new(SystemTimeSource),
        ));
        let controller = Arc::new(NodeController::new(
            flag.clone(),
            chain.clone(),
            world.clone(),
            pool.clone(),
            pipeline,
        ));
        let miner = Arc::new(Miner::new(
            flag,
            pool.clone(),
            Arc::new(DryRunExecutor::new()),
            chain.clone(),
            keypair.clone(),
            config.miner_config(),
        ));
        let producer = Arc::new(ProductionAdapter::new(
            miner,
            controller.clone(),
            network.clone(),
        ));
        let engine_pool = Arc::new(ConsensusPoolAdapter::new(pool.clone(), network.clone()));
        let engine: Arc<NodeEngine> = ConsensusEngine::new(
            config.consensus_settings(),
            keypair,
            engine_pool,
            world.clone(),
            producer,
            world.clone(),
        );
        controller.set_commit_hook(Arc::new(EngineCommitHook::new(engine.clone())));

        let (inbound, inbound_rx) = mpsc::channel(config.runtime.message_queue_capacity);
        let service = NodeService::new(
            controller.clone(),
            chain.clone(),
            world,
            pool.clone(),
            network.clone(),
            inbound_rx,
        );
        let handle = NodeHandle::new(chain, pool, network.clone());

        Self {
            engine,
            controller,
            network,
            handle,
            inbound,
            service,
        }
    }

    /// Start the engine and the message loop.
    pub fn start(self) -> RunningNode {
        self.engine.start();
        let loop_task = tokio::spawn(self.service.run());
        RunningNode {
            engine: self.engine,
            controller: self.controller,
            network: self.network,
            handle: self.handle,
            inbound: self.inbound,
            loop_task,
        }
    }
}

/// A started node.
pub struct RunningNode {
    /// The consensus engine.
    pub engine: Arc<NodeEngine>,
    /// The commit controller.
    pub controller: Arc<NodeController>,
    /// The channel network adapter.
    pub network: Arc<ChannelNetwork>,
    /// The outward node surface.
    pub handle: RuntimeHandle,
    /// Sender into this node's inbound queue.
    pub inbound: mpsc::Sender<InboundEnvelope>,
    loop_task: tokio::task::JoinHandle<()>,
}

impl RunningNode {
    /// Stop the engine's timers and the message loop.
    pub fn shutdown(&self) {
        self.engine.shutdown();
        self.loop_task.abort();
        info!("[hx-node] Node stopped");
    }
}
