//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Static chain id → RPC URL mapping handed to the provider registry.
pub type ChainProviders = BTreeMap<u64, String>;

/// Root configuration for the node client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// Remote server node settings.
    pub node: NodeConfig,

    /// One entry per chain the client can confirm transactions on.
    pub chains: Vec<ChainConfig>,

    /// Transaction confirmation policy used by deposits.
    pub confirmation: ConfirmationConfig,

    /// Local webhook receiver settings.
    pub webhook: WebhookConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl ClientConfig {
    /// Collapse the `[[chains]]` entries into the chain id → URL mapping.
    pub fn chain_providers(&self) -> ChainProviders {
        self.chains
            .iter()
            .map(|chain| (chain.chain_id, chain.rpc_url.clone()))
            .collect()
    }
}

/// Remote server node configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Base URL of the server node HTTP API (e.g., "http://localhost:8001").
    pub url: String,

    /// Base URL the node should POST event webhooks to.
    pub callback_url_base: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8001".to_string(),
            callback_url_base: "http://localhost:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl NodeConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// A single chain RPC endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChainConfig {
    /// Chain ID (e.g., 1 for Ethereum mainnet, 1337 for a local chain).
    pub chain_id: u64,

    /// JSON-RPC endpoint URL.
    pub rpc_url: String,
}

/// Confirmation policy for on-chain deposits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    /// Maximum time to wait for a deposit transaction to confirm.
    pub timeout_secs: u64,

    /// Receipt polling interval in milliseconds.
    pub poll_interval_ms: u64,

    /// Number of blocks (including the inclusion block) required.
    pub confirmations: u32,

    /// Consecutive failed RPC queries tolerated before the wait gives up.
    pub max_rpc_failures: u32,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 300,
            poll_interval_ms: 2000,
            confirmations: 1,
            max_rpc_failures: 10,
        }
    }
}

impl ConfirmationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Webhook receiver configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Bind address for the webhook listener (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum accepted webhook body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
