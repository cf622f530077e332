//! Concrete adapters behind the node's ports.

pub mod consensus;
pub mod in_memory;
pub mod network;

pub use consensus::{
    ConsensusPoolAdapter, EngineCommitHook, NodeController, NodeEngine, NodeMiner,
    ProductionAdapter,
};
pub use in_memory::{DryRunExecutor, InMemoryChainStore, InMemoryPool, InMemoryWorldState};
pub use network::ChannelNetwork;
