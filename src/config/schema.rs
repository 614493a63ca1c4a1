//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, request limits).
    pub listener: ListenerConfig,

    /// Chain connection and transaction parameters.
    pub chain: ChainConfig,

    /// Deployed registry contract.
    pub contract: ContractConfig,

    /// Known-builder list used for client lookups.
    pub builders: BuildersConfig,

    /// Profile link verification.
    pub verification: VerificationConfig,

    /// Broadcast retry backoff.
    pub retries: RetryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:5000").
    pub bind_address: String,

    /// Deadline for read and health requests.
    pub request_timeout_secs: u64,

    /// Deadline for write requests. Must outlast the broadcast retries and the
    /// confirmation wait so an unconfirmed write still returns its hash.
    pub write_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
            request_timeout_secs: 30,
            write_timeout_secs: 300,
        }
    }
}

/// Chain connection and transaction construction settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChainConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Failover JSON-RPC endpoint URLs, tried in order on connection failure.
    pub failover_urls: Vec<String>,

    /// Chain ID used for EIP-155 signing (1287 = Moonbase Alpha).
    pub chain_id: u64,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Gas limit applied to every write. A fixed ceiling, not an estimate.
    pub gas_limit: u64,

    /// Fixed gas price in gwei. When unset the node's price is used.
    pub gas_price_gwei: Option<u64>,

    /// Multiplier applied to a node-reported gas price.
    pub gas_price_multiplier: f64,

    /// Maximum gas price in gwei (protection against spikes).
    pub max_gas_price_gwei: u64,

    /// How long a write waits for its receipt before reporting it unconfirmed.
    pub confirmation_timeout_secs: u64,

    /// Receipt polling interval in milliseconds.
    pub receipt_poll_interval_ms: u64,

    /// Broadcast attempts per write.
    pub max_broadcast_attempts: u32,

    /// If set, the signer derived from the private key must have this address.
    pub expected_sender: Option<String>,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://rpc.api.moonbase.moonbeam.network".to_string(),
            failover_urls: Vec::new(),
            chain_id: 1287,
            rpc_timeout_secs: 10,
            gas_limit: 5_000_000,
            gas_price_gwei: Some(20),
            gas_price_multiplier: 1.2,
            max_gas_price_gwei: 500,
            confirmation_timeout_secs: 120,
            receipt_poll_interval_ms: 2000,
            max_broadcast_attempts: 3,
            expected_sender: None,
        }
    }
}

/// Registry contract location and interface definition.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ContractConfig {
    /// Deployed contract address.
    pub address: String,

    /// Path to the ABI file (bare ABI, artifact, or solc combined output).
    pub abi_path: String,

    /// Source file key inside solc combined output.
    pub source_name: Option<String>,

    /// Contract name inside solc combined output.
    pub contract_name: Option<String>,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            address: "0xCCc0F45E8bE87022ea3E553BdD2f64cD6aAeed79".to_string(),
            abi_path: "abi/CredChain.json".to_string(),
            source_name: None,
            contract_name: None,
        }
    }
}

/// Known-builder list settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BuildersConfig {
    /// JSON file holding an array of builder addresses. Read on every client query.
    pub path: String,

    /// Number of builders read concurrently during a client scan.
    pub scan_concurrency: usize,
}

impl Default for BuildersConfig {
    fn default() -> Self {
        Self {
            path: "builders.json".to_string(),
            scan_concurrency: 4,
        }
    }
}

/// Profile link reachability check.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Timeout for the profile link request in seconds.
    pub reachability_timeout_secs: u64,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            reachability_timeout_secs: 5,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay between retries in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 250,
            max_delay_ms: 4000,
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
