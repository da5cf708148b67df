//! Admission error taxonomy.
//!
//! Every variant is terminal for the call that produced it. Nothing here is
//! retried internally; callers decide whether to retry (for example after a
//! cooldown has elapsed).

use alloy::primitives::{Address, U256};
use thiserror::Error;

use crate::access::Role;

/// Argument validation failures, rejected before any state is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidArgument {
    /// A role grant or collaborator targeted the null principal.
    #[error("zero address is not a valid principal")]
    ZeroAddress,

    /// A cap of zero would permanently lock the principal out.
    #[error("amount must be greater than zero")]
    AmountTooSmall,

    /// Parallel batch arrays disagree in length.
    #[error("array length mismatch: {left} != {right}")]
    ArrayLengthMismatch { left: usize, right: usize },

    /// A zero-length accounting window.
    #[error("period duration must be greater than zero")]
    ZeroPeriodDuration,

    /// A recovery sweep targeted the gate's own account.
    #[error("cannot recover tokens to the gate itself")]
    SelfRecovery,
}

/// Errors returned by the whitelist, limiter and gate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    #[error("{caller} lacks role {role}")]
    Unauthorized { role: Role, caller: Address },

    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] InvalidArgument),

    #[error("{0} is not whitelisted")]
    NotWhitelisted(Address),

    #[error("amount {amount} exceeds single-transfer cap {max}")]
    LimitExceeded { amount: U256, max: U256 },

    #[error("cooldown not elapsed, next transfer allowed at {next_allowed_at}")]
    CooldownNotElapsed { next_allowed_at: u64 },

    #[error("period limit exceeded: {period_total} + {requested} > {period_limit}")]
    ExceedsPeriodLimit {
        requested: U256,
        period_total: U256,
        period_limit: U256,
    },

    #[error("ledger is paused")]
    Paused,

    #[error("insufficient balance for {account}: have {balance}, need {required}")]
    InsufficientBalance {
        account: Address,
        balance: U256,
        required: U256,
    },

    /// Crediting `amount` would push a balance or the supply of `asset`
    /// past `U256::MAX`.
    #[error("crediting {amount} of {asset} would overflow")]
    SupplyOverflow { asset: Address, amount: U256 },
}

impl GateError {
    /// Short stable label used for metrics and log fields.
    pub fn reason(&self) -> &'static str {
        match self {
            GateError::Unauthorized { .. } => "unauthorized",
            GateError::InvalidArgument(_) => "invalid_argument",
            GateError::NotWhitelisted(_) => "not_whitelisted",
            GateError::LimitExceeded { .. } => "limit_exceeded",
            GateError::CooldownNotElapsed { .. } => "cooldown_not_elapsed",
            GateError::ExceedsPeriodLimit { .. } => "exceeds_period_limit",
            GateError::Paused => "paused",
            GateError::InsufficientBalance { .. } => "insufficient_balance",
            GateError::SupplyOverflow { .. } => "supply_overflow",
        }
    }
}

/// Result type for gate operations.
pub type GateResult<T> = Result<T, GateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GateError::CooldownNotElapsed { next_allowed_at: 160 };
        assert_eq!(
            err.to_string(),
            "cooldown not elapsed, next transfer allowed at 160"
        );

        let err: GateError = InvalidArgument::ArrayLengthMismatch { left: 2, right: 3 }.into();
        assert_eq!(err.to_string(), "invalid argument: array length mismatch: 2 != 3");
        assert_eq!(err.reason(), "invalid_argument");
    }

    #[test]
    fn test_period_limit_message() {
        let err = GateError::ExceedsPeriodLimit {
            requested: U256::from(1000),
            period_total: U256::from(1100),
            period_limit: U256::from(2000),
        };
        assert!(err.to_string().contains("1100 + 1000 > 2000"));
    }
}
