//! Configuration validation.
//!
//! Serde handles syntax; this module checks that every address and amount
//! parses and that no value would lock principals out. All errors are
//! returned, not just the first.

use alloy::primitives::{Address, U256};
use std::net::SocketAddr;
use std::str::FromStr;
use thiserror::Error;

use crate::config::schema::{GateConfig, LimitSettings};
use crate::limiter::LimitConfig;

/// A single semantic configuration error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid address '{value}'")]
    InvalidAddress { field: String, value: String },

    #[error("{field}: zero address not allowed")]
    ZeroAddress { field: String },

    #[error("{field}: invalid amount '{value}'")]
    InvalidAmount { field: String, value: String },

    #[error("{field}: must be greater than zero")]
    Zero { field: String },

    #[error("{field}: invalid socket address '{value}'")]
    InvalidSocketAddress { field: String, value: String },

    #[error("{field}: must not be empty")]
    Empty { field: String },
}

/// Parse an address string.
pub fn parse_address(field: &str, value: &str) -> Result<Address, ValidationError> {
    Address::from_str(value.trim()).map_err(|_| ValidationError::InvalidAddress {
        field: field.to_string(),
        value: value.to_string(),
    })
}

/// Parse an address string that must not be the null principal.
pub fn parse_principal(field: &str, value: &str) -> Result<Address, ValidationError> {
    let address = parse_address(field, value)?;
    if address == Address::ZERO {
        return Err(ValidationError::ZeroAddress {
            field: field.to_string(),
        });
    }
    Ok(address)
}

/// Parse a decimal or 0x-prefixed amount; `"max"` means no limit.
pub fn parse_amount(field: &str, value: &str) -> Result<U256, ValidationError> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("max") {
        return Ok(U256::MAX);
    }
    U256::from_str(value).map_err(|_| ValidationError::InvalidAmount {
        field: field.to_string(),
        value: value.to_string(),
    })
}

/// Resolve a [`LimitSettings`] block into a [`LimitConfig`].
pub fn resolve_limits(field: &str, settings: &LimitSettings) -> Result<LimitConfig, Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut nonzero_amount = |name: &str, value: &str| -> U256 {
        let field = format!("{field}.{name}");
        match parse_amount(&field, value) {
            Ok(amount) if amount.is_zero() => {
                errors.push(ValidationError::Zero { field });
                U256::ZERO
            }
            Ok(amount) => amount,
            Err(e) => {
                errors.push(e);
                U256::ZERO
            }
        }
    };
    let max_transfer_amount = nonzero_amount("max_transfer_amount", &settings.max_transfer_amount);
    let period_limit = nonzero_amount("period_limit", &settings.period_limit);

    if settings.period_duration_secs == 0 {
        errors.push(ValidationError::Zero {
            field: format!("{field}.period_duration_secs"),
        });
    }

    if errors.is_empty() {
        Ok(LimitConfig {
            max_transfer_amount,
            cooldown_period: settings.cooldown_secs,
            period_limit,
            period_duration: settings.period_duration_secs,
        })
    } else {
        Err(errors)
    }
}

fn check<T>(errors: &mut Vec<ValidationError>, result: Result<T, ValidationError>) {
    if let Err(e) = result {
        errors.push(e);
    }
}

fn check_all(errors: &mut Vec<ValidationError>, field: &str, values: &[String]) {
    for (i, value) in values.iter().enumerate() {
        check(errors, parse_principal(&format!("{field}[{i}]"), value));
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GateConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check(&mut errors, parse_principal("service.identity", &config.service.identity));
    check(&mut errors, parse_principal("service.admin", &config.service.admin));

    check_all(&mut errors, "gate.minters", &config.gate.minters);
    check_all(&mut errors, "whitelist.members", &config.whitelist.members);
    check_all(&mut errors, "whitelist.whitelisters", &config.whitelist.whitelisters);
    check_all(&mut errors, "limits.managers", &config.limits.managers);

    if let Err(mut e) = resolve_limits("limits.fallback", &config.limits.fallback) {
        errors.append(&mut e);
    }
    for (i, asset) in config.limits.assets.iter().enumerate() {
        let field = format!("limits.assets[{i}]");
        check(&mut errors, parse_principal(&format!("{field}.asset"), &asset.asset));
        if let Err(mut e) = resolve_limits(&field, &asset.limits) {
            errors.append(&mut e);
        }
    }
    for (i, exemption) in config.limits.exemptions.iter().enumerate() {
        let field = format!("limits.exemptions[{i}]");
        check(&mut errors, parse_principal(&format!("{field}.asset"), &exemption.asset));
        check(&mut errors, parse_principal(&format!("{field}.account"), &exemption.account));
    }

    if config.persistence.enabled && config.persistence.snapshot_path.trim().is_empty() {
        errors.push(ValidationError::Empty {
            field: "persistence.snapshot_path".to_string(),
        });
    }

    if config.admin.enabled {
        check(&mut errors, parse_principal("admin.operator", &config.admin.operator));
        check(&mut errors, parse_socket("admin.bind_address", &config.admin.bind_address));
        if config.admin.api_key.is_empty() {
            errors.push(ValidationError::Empty {
                field: "admin.api_key".to_string(),
            });
        }
    }

    if config.observability.metrics_enabled {
        check(
            &mut errors,
            parse_socket("observability.metrics_address", &config.observability.metrics_address),
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Parse a socket address.
pub fn parse_socket(field: &str, value: &str) -> Result<SocketAddr, ValidationError> {
    value.parse().map_err(|_| ValidationError::InvalidSocketAddress {
        field: field.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{AssetLimitConfig, ExemptionConfig};

    const IDENTITY: &str = "0x6a6a6a6a6a6a6a6a6a6a6a6a6a6a6a6a6a6a6a6a";
    const ADMIN: &str = "0xadadadadadadadadadadadadadadadadadadadad";

    fn valid_config() -> GateConfig {
        let mut config = GateConfig::default();
        config.service.identity = IDENTITY.to_string();
        config.service.admin = ADMIN.to_string();
        config
    }

    #[test]
    fn test_default_with_identities_is_valid() {
        assert_eq!(validate_config(&valid_config()), Ok(()));
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("f", "max").unwrap(), U256::MAX);
        assert_eq!(parse_amount("f", "1000").unwrap(), U256::from(1000));
        assert_eq!(parse_amount("f", "0x10").unwrap(), U256::from(16));
        assert!(parse_amount("f", "ten").is_err());
    }

    #[test]
    fn test_zero_limits_rejected() {
        let mut config = valid_config();
        config.limits.assets.push(AssetLimitConfig {
            asset: "0x7070707070707070707070707070707070707070".to_string(),
            limits: LimitSettings {
                max_transfer_amount: "0".to_string(),
                cooldown_secs: 60,
                period_limit: "2000".to_string(),
                period_duration_secs: 0,
            },
        });

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::Zero {
                    field: "limits.assets[0].max_transfer_amount".to_string()
                },
                ValidationError::Zero {
                    field: "limits.assets[0].period_duration_secs".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_resolve_limits() {
        let limits = resolve_limits(
            "x",
            &LimitSettings {
                max_transfer_amount: "1000".to_string(),
                cooldown_secs: 60,
                period_limit: "2000".to_string(),
                period_duration_secs: 86_400,
            },
        )
        .unwrap();
        assert_eq!(limits.max_transfer_amount, U256::from(1000));
        assert_eq!(limits.cooldown_period, 60);
    }

    #[test]
    fn test_admin_requires_operator() {
        let mut config = valid_config();
        config.admin.enabled = true;
        config.limits.exemptions.push(ExemptionConfig {
            asset: "bogus".to_string(),
            account: ADMIN.to_string(),
        });

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.to_string().starts_with("admin.operator")));
    }
}
