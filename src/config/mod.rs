//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (read & deserialize)
//!     → validation.rs (semantic checks, all errors collected)
//!     → GateConfig (validated, immutable)
//!     → lifecycle::startup provisions whitelist, limiter and gate
//! ```
//!
//! # Design Decisions
//! - Config only seeds state at startup; afterwards every change goes
//!   through role-gated operations, and a persisted snapshot wins over
//!   the seed
//! - All fields have defaults to allow minimal configs
//! - Addresses and amounts stay strings until validation parses them

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AdminConfig, AssetLimitConfig, ExemptionConfig, GateConfig, GateSwitchConfig, LimitSettings,
    LimitsConfig, ObservabilityConfig, PersistenceConfig, ServiceConfig, WhitelistConfig,
};
pub use validation::{validate_config, ValidationError};
