//! Configuration loading from disk.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::GateConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<GateConfig, ConfigError> {
    let config: GateConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GateConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let config = parse_config(
            r#"
            [service]
            identity = "0x6a6a6a6a6a6a6a6a6a6a6a6a6a6a6a6a6a6a6a6a"
            admin = "0xadadadadadadadadadadadadadadadadadadadad"
            "#,
        )
        .unwrap();
        assert!(config.gate.whitelist_checks_enabled);
        assert!(config.limits.assets.is_empty());
    }

    #[test]
    fn test_validation_errors_are_collected() {
        let err = parse_config(
            r#"
            [service]
            identity = "not-an-address"
            admin = "0x0000000000000000000000000000000000000000"
            "#,
        )
        .unwrap_err();
        match err {
            ConfigError::Validation(errors) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_example_config_parses() {
        let config = parse_config(include_str!("../../ledger-gate.example.toml")).unwrap();
        assert_eq!(config.limits.assets.len(), 1);
        assert_eq!(config.limits.assets[0].limits.cooldown_secs, 60);
        assert_eq!(config.limits.fallback.max_transfer_amount, "max");
        assert!(config.admin.enabled);
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/nonexistent/ledger-gate.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
