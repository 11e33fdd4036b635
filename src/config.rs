//! Configuration management for wallet-pulse
//!
//! Loads configuration from environment variables (with `.env` support via
//! dotenvy in `main`). Defaults cover everything except the RPC endpoint and
//! the database URL, which are required.

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Solana RPC endpoint URL (required, `SOLANA_RPC_URL`)
    #[serde(default)]
    pub solana_rpc_url: String,
    /// PostgreSQL connection URL (required, `DATABASE_URL`)
    #[serde(default)]
    pub database_url: String,
    /// HTTP port for the health endpoint (`PORT`)
    #[serde(default = "default_port")]
    pub port: u16,
    /// WebSocket push port (`WS_PORT`)
    #[serde(default = "default_ws_port")]
    pub ws_port: u16,
    /// Database pool settings
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Monitor cycle tunables
    #[serde(default)]
    pub monitor: MonitorConfig,
    /// RPC client tunables
    #[serde(default)]
    pub rpc: RpcConfig,
}

fn default_port() -> u16 {
    3000
}

fn default_ws_port() -> u16 {
    8080
}

/// Database pool configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Maximum connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Acquire timeout in seconds
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout() -> u64 {
    30
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout(),
        }
    }
}

/// Monitor cycle configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Interval between polling cycles (seconds)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Signatures requested per wallet per cycle
    #[serde(default = "default_signature_limit")]
    pub signature_limit: usize,
    /// Persisted signatures preloaded into the seen set for a new wallet
    #[serde(default = "default_seen_preload")]
    pub seen_preload_limit: usize,
    /// Capacity of the seen-signature LRU cache
    #[serde(default = "default_seen_capacity")]
    pub seen_capacity: usize,
}

fn default_poll_interval() -> u64 {
    5
}

fn default_signature_limit() -> usize {
    15
}

fn default_seen_preload() -> usize {
    20
}

fn default_seen_capacity() -> usize {
    10_000
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            signature_limit: default_signature_limit(),
            seen_preload_limit: default_seen_preload(),
            seen_capacity: default_seen_capacity(),
        }
    }
}

/// RPC client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RpcConfig {
    /// Rate limit for RPC calls (requests per second)
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_second: u32,
    /// Request timeout in seconds
    #[serde(default = "default_rpc_timeout")]
    pub timeout_secs: u64,
}

fn default_rate_limit() -> u32 {
    40
}

fn default_rpc_timeout() -> u64 {
    10
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            rate_limit_per_second: default_rate_limit(),
            timeout_secs: default_rpc_timeout(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the environment
    ///
    /// `SOLANA_RPC_URL` and `DATABASE_URL` map onto the top-level fields;
    /// nested sections use a double-underscore separator, e.g.
    /// `MONITOR__POLL_INTERVAL_SECS=10`.
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("port", default_port() as i64)?
            .set_default("ws_port", default_ws_port() as i64)?
            .add_source(Environment::default().separator("__").try_parsing(true))
            .build()?;

        config.try_deserialize()
    }

    /// Validate required values; the binary exits non-zero on failure
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.solana_rpc_url.is_empty() {
            return Err(ConfigError::Message(
                "SOLANA_RPC_URL must be set".to_string(),
            ));
        }

        if self.database_url.is_empty() {
            return Err(ConfigError::Message("DATABASE_URL must be set".to_string()));
        }

        if self.monitor.poll_interval_secs == 0 {
            return Err(ConfigError::Message(
                "MONITOR__POLL_INTERVAL_SECS must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
