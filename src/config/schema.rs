//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the minter.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Default JSON-RPC endpoint the form mints against.
pub const DEFAULT_RPC_URL: &str = "https://api.mainnet-beta.solana.com";

/// Root configuration for the token minter.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MinterConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Chain RPC endpoint settings.
    pub rpc: RpcConfig,

    /// Wallet session settings.
    pub wallet: WalletConfig,

    /// Key custody and checkpoint storage.
    pub custody: CustodyConfig,

    /// Mint pipeline settings.
    pub mint: MintConfig,

    /// HTTP timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Chain RPC configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RpcConfig {
    /// JSON-RPC endpoint URL.
    pub url: String,

    /// Commitment level for every read and write (processed, confirmed, finalized).
    pub commitment: String,

    /// Per-call timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_RPC_URL.to_string(),
            commitment: "confirmed".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Wallet session configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Restore the remembered wallet on startup.
    pub auto_connect: bool,

    /// Base58 public key of a previously authorized wallet.
    pub remembered_key: Option<String>,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            auto_connect: true,
            remembered_key: None,
        }
    }
}

/// Key custody configuration.
///
/// Without a directory, keys and checkpoints only live in memory and are lost
/// on restart.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CustodyConfig {
    /// Directory holding pending keypairs, retired keypairs and the checkpoint.
    pub dir: Option<String>,
}

/// Mint pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MintConfig {
    /// Minimum authority balance checked before the first transaction (0 disables).
    pub min_authority_lamports: u64,
}

/// Timeout configuration for HTTP requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout in seconds. Does not apply to the event stream.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
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
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MinterConfig::default();
        assert_eq!(config.rpc.url, DEFAULT_RPC_URL);
        assert_eq!(config.rpc.commitment, "confirmed");
        assert!(config.wallet.auto_connect);
        assert!(config.custody.dir.is_none());
        assert_eq!(config.mint.min_authority_lamports, 0);
    }

    #[test]
    fn test_partial_toml() {
        let config: MinterConfig = toml::from_str(
            r#"
            [rpc]
            url = "https://api.devnet.solana.com"

            [custody]
            dir = "/var/lib/minter"
            "#,
        )
        .unwrap();

        assert_eq!(config.rpc.url, "https://api.devnet.solana.com");
        assert_eq!(config.rpc.timeout_secs, 30);
        assert_eq!(config.custody.dir.as_deref(), Some("/var/lib/minter"));
        assert_eq!(config.listener.bind_address, "127.0.0.1:8080");
    }
}
