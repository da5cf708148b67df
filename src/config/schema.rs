//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gate
//! service. All types derive Serde traits for deserialization from TOML.

use serde::{Deserialize, Serialize};

use crate::limiter::DEFAULT_PERIOD_DURATION_SECS;

/// Root configuration for the ledger gate service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GateConfig {
    /// Service identity and bootstrap administrator.
    pub service: ServiceConfig,

    /// Initial gate switches and minters.
    pub gate: GateSwitchConfig,

    /// Whitelist seed.
    pub whitelist: WhitelistConfig,

    /// Rate limit defaults, managers and exemptions.
    pub limits: LimitsConfig,

    /// Snapshot persistence.
    pub persistence: PersistenceConfig,

    /// Administrative HTTP API.
    pub admin: AdminConfig,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,
}

/// Identities the service runs under.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Address the gate uses as the limiter's trusted caller.
    pub identity: String,

    /// Address granted ADMIN on every component at first start.
    pub admin: String,
}

/// Initial gate switches.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GateSwitchConfig {
    pub paused: bool,
    pub whitelist_checks_enabled: bool,
    pub limit_checks_enabled: bool,

    /// Accounts granted MINTER.
    pub minters: Vec<String>,
}

impl Default for GateSwitchConfig {
    fn default() -> Self {
        Self {
            paused: false,
            whitelist_checks_enabled: true,
            limit_checks_enabled: true,
            minters: Vec::new(),
        }
    }
}

/// Whitelist seed.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WhitelistConfig {
    /// Enforce membership.
    pub enabled: bool,

    /// Accounts whitelisted at first start.
    pub members: Vec<String>,

    /// Accounts granted WHITELISTER.
    pub whitelisters: Vec<String>,
}

impl Default for WhitelistConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            members: Vec::new(),
            whitelisters: Vec::new(),
        }
    }
}

/// One set of limit values. Amounts are decimal or 0x-prefixed strings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitSettings {
    /// Single-transfer cap; "max" for no cap.
    pub max_transfer_amount: String,

    /// Seconds between transfers.
    pub cooldown_secs: u64,

    /// Quota per window; "max" for no quota.
    pub period_limit: String,

    /// Window length in seconds.
    pub period_duration_secs: u64,
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            max_transfer_amount: "max".to_string(),
            cooldown_secs: 0,
            period_limit: "max".to_string(),
            period_duration_secs: DEFAULT_PERIOD_DURATION_SECS,
        }
    }
}

/// Default limits for one asset.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssetLimitConfig {
    pub asset: String,

    #[serde(flatten)]
    pub limits: LimitSettings,
}

/// A seeded exemption.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExemptionConfig {
    pub asset: String,
    pub account: String,
}

/// Rate limit seed.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct LimitsConfig {
    /// Applied to assets without their own entry.
    pub fallback: LimitSettings,

    /// Per-asset defaults.
    pub assets: Vec<AssetLimitConfig>,

    /// Accounts granted LIMIT_MANAGER.
    pub managers: Vec<String>,

    pub exemptions: Vec<ExemptionConfig>,
}

/// Snapshot persistence.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub enabled: bool,

    /// JSON snapshot file.
    pub snapshot_path: String,

    /// Periodic snapshot interval in seconds; 0 saves only on shutdown.
    pub snapshot_interval_secs: u64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            snapshot_path: "ledger-gate-state.json".to_string(),
            snapshot_interval_secs: 300,
        }
    }
}

/// Administrative API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,

    /// Address the admin API acts as for role checks.
    pub operator: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
            operator: String::new(),
            request_timeout_secs: 10,
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
