//! Limit configuration and per-principal accounting state.

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::error::{GateError, GateResult, InvalidArgument};

/// Default accounting window: one day.
pub const DEFAULT_PERIOD_DURATION_SECS: u64 = 86_400;

/// The four limit dimensions, as a default for an asset or a principal override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitConfig {
    /// Single-transfer cap.
    pub max_transfer_amount: U256,
    /// Minimum seconds between two transfers of the same principal.
    pub cooldown_period: u64,
    /// Total allowed within one accounting window.
    pub period_limit: U256,
    /// Accounting window length in seconds.
    pub period_duration: u64,
}

impl LimitConfig {
    /// No cap, no cooldown, no quota.
    pub const fn unlimited() -> Self {
        Self {
            max_transfer_amount: U256::MAX,
            cooldown_period: 0,
            period_limit: U256::MAX,
            period_duration: DEFAULT_PERIOD_DURATION_SECS,
        }
    }

    /// Reject values that would lock principals out or break window math.
    pub fn validate(&self) -> GateResult<()> {
        validate_amount(self.max_transfer_amount)?;
        validate_period(self.period_limit, self.period_duration)
    }
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self::unlimited()
    }
}

pub(crate) fn validate_amount(amount: U256) -> GateResult<()> {
    if amount.is_zero() {
        return Err(InvalidArgument::AmountTooSmall.into());
    }
    Ok(())
}

pub(crate) fn validate_period(limit: U256, duration: u64) -> GateResult<()> {
    validate_amount(limit)?;
    if duration == 0 {
        return Err(InvalidArgument::ZeroPeriodDuration.into());
    }
    Ok(())
}

/// Accounting state for one (asset, principal) pair.
///
/// `period_reset_at == 0` means the principal has never opened a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PrincipalState {
    pub custom: LimitConfig,
    pub has_custom_cap: bool,
    pub has_custom_cooldown: bool,
    /// Covers both `period_limit` and `period_duration`.
    pub has_custom_period: bool,
    pub exempt: bool,
    pub last_transfer_at: u64,
    pub period_total: U256,
    pub period_reset_at: u64,
}

impl PrincipalState {
    /// Merge overrides onto the asset default.
    pub fn effective(&self, defaults: &LimitConfig) -> LimitConfig {
        LimitConfig {
            max_transfer_amount: if self.has_custom_cap {
                self.custom.max_transfer_amount
            } else {
                defaults.max_transfer_amount
            },
            cooldown_period: if self.has_custom_cooldown {
                self.custom.cooldown_period
            } else {
                defaults.cooldown_period
            },
            period_limit: if self.has_custom_period {
                self.custom.period_limit
            } else {
                defaults.period_limit
            },
            period_duration: if self.has_custom_period {
                self.custom.period_duration
            } else {
                defaults.period_duration
            },
        }
    }

    /// Drop every override flag. Counters are left untouched.
    pub fn clear_overrides(&mut self) {
        self.has_custom_cap = false;
        self.has_custom_cooldown = false;
        self.has_custom_period = false;
    }

    /// Earliest time the next transfer may pass the cooldown.
    ///
    /// Returns `None` when the principal has never transferred.
    pub fn cooldown_until(&self, cooldown: u64) -> Option<u64> {
        if self.last_transfer_at == 0 {
            None
        } else {
            Some(self.last_transfer_at.saturating_add(cooldown))
        }
    }

    pub fn check_cooldown(&self, cooldown: u64, now: u64) -> GateResult<()> {
        match self.cooldown_until(cooldown) {
            Some(next_allowed_at) if now < next_allowed_at => {
                Err(GateError::CooldownNotElapsed { next_allowed_at })
            }
            _ => Ok(()),
        }
    }

    /// `(period_total, period_reset_at)` as seen at `now`, after lazy rotation.
    pub fn window_at(&self, duration: u64, now: u64) -> (U256, u64) {
        if self.period_reset_at == 0 || now >= self.period_reset_at {
            (U256::ZERO, now.saturating_add(duration))
        } else {
            (self.period_total, self.period_reset_at)
        }
    }

    /// Validate adding `amount` to the window at `now` without mutating.
    ///
    /// Returns the window that would result on success.
    pub fn plan_consumption(&self, limits: &LimitConfig, amount: U256, now: u64) -> GateResult<(U256, u64)> {
        let (period_total, reset_at) = self.window_at(limits.period_duration, now);
        let exceeded = || GateError::ExceedsPeriodLimit {
            requested: amount,
            period_total,
            period_limit: limits.period_limit,
        };
        let next_total = period_total.checked_add(amount).ok_or_else(exceeded)?;
        if next_total > limits.period_limit {
            return Err(exceeded());
        }
        Ok((next_total, reset_at))
    }
}

/// A principal's limits, accounting and next-allowed times as seen now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalView {
    pub asset: Address,
    pub account: Address,
    pub exempt: bool,
    pub effective: LimitConfig,
    pub remaining_allowance: U256,
    pub period_reset_at: u64,
    pub next_valid_transfer_time: u64,
}
