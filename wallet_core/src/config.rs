//! Dashboard configuration with TOML file support.

use serde::{Deserialize, Serialize};
use soldash_types::Address;
use soldash_utils::LogFormat;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;
use crate::rpc::DEVNET_URL;
use crate::wallet::SessionOptions;

/// Which ledger implementation backs the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerBackend {
    /// In-memory ledger with simulated confirmation delay.
    Null,
    /// Solana JSON-RPC endpoint (read-only).
    Rpc,
}

/// Configuration for the dashboard.
///
/// Can be loaded from a TOML file via [`DashboardConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_ledger")]
    pub ledger: LedgerBackend,

    /// JSON-RPC endpoint for the `rpc` backend.
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// Wallet address: watched read-only by the `rpc` backend, seeded as the
    /// demo wallet by the `null` backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watch_address: Option<Address>,

    /// Upper bound on any single ledger call.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Simulated confirmation delay of the `null` backend.
    #[serde(default = "default_null_latency_ms")]
    pub null_latency_ms: u64,

    /// Number of history entries fetched on refresh.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_ledger() -> LedgerBackend {
    LedgerBackend::Null
}

fn default_rpc_url() -> String {
    DEVNET_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_null_latency_ms() -> u64 {
    1500
}

fn default_history_limit() -> usize {
    20
}

fn default_log_format() -> LogFormat {
    LogFormat::Human
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl DashboardConfig {
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Reject values that would make every ledger call fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Parse(
                "request_timeout_secs must be at least 1".into(),
            ));
        }
        if self.ledger == LedgerBackend::Rpc && self.rpc_url.trim().is_empty() {
            return Err(ConfigError::Parse("rpc_url is required for the rpc ledger".into()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn null_latency(&self) -> Duration {
        Duration::from_millis(self.null_latency_ms)
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            request_timeout: self.request_timeout(),
            history_limit: self.history_limit,
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            ledger: default_ledger(),
            rpc_url: default_rpc_url(),
            watch_address: None,
            request_timeout_secs: default_request_timeout_secs(),
            null_latency_ms: default_null_latency_ms(),
            history_limit: default_history_limit(),
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}
