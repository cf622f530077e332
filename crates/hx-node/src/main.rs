//! Helix-Chain node binary.

use anyhow::Result;
use hx_consensus::ConsensusMode;
use hx_node::{NodeConfig, NodeRuntime};
use shared_crypto::NodeKeyPair;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Load configuration from defaults and `HX_*` environment overrides.
fn load_config() -> NodeConfig {
    let mut config = NodeConfig::default();

    if let Ok(value) = std::env::var("HX_CHAIN_ID") {
        if let Ok(chain_id) = value.parse() {
            config.chain.chain_id = chain_id;
        }
    }
    if let Ok(value) = std::env::var("HX_MINING_INTERVAL_MS") {
        if let Ok(interval) = value.parse() {
            config.consensus.mining_interval_ms = interval;
        }
    }
    if let Ok(value) = std::env::var("HX_IS_GENERATOR") {
        config.consensus.is_generator = matches!(value.as_str(), "1" | "true");
    }
    if let Ok(value) = std::env::var("HX_PRODUCERS") {
        for part in value.split(',').filter(|p| !p.is_empty()) {
            match hex::decode(part.trim()) {
                Ok(bytes) if bytes.len() == 32 => {
                    let mut key = [0u8; 32];
                    key.copy_from_slice(&bytes);
                    config.consensus.producers.push(key);
                }
                _ => warn!("HX_PRODUCERS entry must be 32 bytes of hex, skipping"),
            }
        }
    }
    if let Ok(value) = std::env::var("HX_KEY_SEED") {
        match hex::decode(&value) {
            Ok(bytes) if bytes.len() == 32 => {
                let mut seed = [0u8; 32];
                seed.copy_from_slice(&bytes);
                config.consensus.key_seed = Some(seed);
            }
            _ => warn!("HX_KEY_SEED must be 32 bytes of hex, generating a random key"),
        }
    }
    if let Ok(value) = std::env::var("HX_CONSENSUS_MODE") {
        config.consensus.mode = match value.as_str() {
            "delegated" => ConsensusMode::Delegated,
            "threshold" => {
                let expected_pool_size = std::env::var("HX_EXPECTED_POOL_SIZE")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(64);
                ConsensusMode::Threshold { expected_pool_size }
            }
            "single" => ConsensusMode::SingleNode {
                interval_ms: config.consensus.mining_interval_ms,
            },
            other => {
                warn!("Unknown HX_CONSENSUS_MODE '{other}', keeping delegated");
                ConsensusMode::Delegated
            }
        };
    }

    config
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config();
    let keypair = match config.consensus.key_seed {
        Some(seed) => NodeKeyPair::from_seed(seed),
        None => NodeKeyPair::generate(),
    };
    info!("Node identity: {}", hex::encode(keypair.public_key()));

    let node = NodeRuntime::build(&config, keypair).start();

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    node.shutdown();
    Ok(())
}
