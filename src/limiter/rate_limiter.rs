//! Per-asset, per-principal transfer limiter.
//!
//! Two independent temporal mechanisms run per (asset, principal): a cooldown
//! timer and a rolling period quota. Both are evaluated lazily against the
//! injected clock; there is no background reset task.

use alloy::primitives::{Address, U256};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::access::{AccessControl, Role, RoleGrant};
use crate::clock::Clock;
use crate::error::{GateError, GateResult, InvalidArgument};
use crate::events::{EventBus, GateEvent};
use crate::limiter::types::{validate_amount, validate_period, LimitConfig, PrincipalState, PrincipalView};
use crate::observability::metrics;

type StateKey = (Address, Address);

/// Persisted default limits for one asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetLimits {
    pub asset: Address,
    pub limits: LimitConfig,
}

/// Persisted state for one (asset, principal) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalRecord {
    pub asset: Address,
    pub account: Address,
    pub state: PrincipalState,
}

/// Persisted form of a [`RateLimiter`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimiterSnapshot {
    pub defaults: Vec<AssetLimits>,
    pub principals: Vec<PrincipalRecord>,
    pub roles: Vec<RoleGrant>,
}

/// Transfer caps, cooldowns and period quotas.
#[derive(Debug)]
pub struct RateLimiter {
    /// Used for assets without configured defaults.
    fallback: LimitConfig,
    defaults: DashMap<Address, LimitConfig>,
    /// Each entry guard is the single writer for its pair.
    states: DashMap<StateKey, PrincipalState>,
    access: AccessControl,
    events: EventBus,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(
        admin: Address,
        fallback: LimitConfig,
        clock: Arc<dyn Clock>,
        events: EventBus,
    ) -> GateResult<Self> {
        fallback.validate()?;
        Ok(Self {
            fallback,
            defaults: DashMap::new(),
            states: DashMap::new(),
            access: AccessControl::new(admin)?,
            events,
            clock,
        })
    }

    /// Restore a limiter from a snapshot.
    pub fn from_snapshot(
        snapshot: LimiterSnapshot,
        fallback: LimitConfig,
        clock: Arc<dyn Clock>,
        events: EventBus,
    ) -> Self {
        let defaults = snapshot
            .defaults
            .into_iter()
            .map(|d| (d.asset, d.limits))
            .collect();
        let states: DashMap<StateKey, PrincipalState> = snapshot
            .principals
            .into_iter()
            .map(|p| ((p.asset, p.account), p.state))
            .collect();
        metrics::record_tracked_principals(states.len());
        Self {
            fallback,
            defaults,
            states,
            access: AccessControl::from_grants(snapshot.roles),
            events,
            clock,
        }
    }

    pub fn snapshot(&self) -> LimiterSnapshot {
        let mut defaults: Vec<AssetLimits> = self
            .defaults
            .iter()
            .map(|r| AssetLimits {
                asset: *r.key(),
                limits: *r.value(),
            })
            .collect();
        defaults.sort_by_key(|d| d.asset);

        let mut principals: Vec<PrincipalRecord> = self
            .states
            .iter()
            .map(|r| PrincipalRecord {
                asset: r.key().0,
                account: r.key().1,
                state: *r.value(),
            })
            .collect();
        principals.sort_by_key(|p| (p.asset, p.account));

        LimiterSnapshot {
            defaults,
            principals,
            roles: self.access.grants(),
        }
    }

    pub fn access(&self) -> &AccessControl {
        &self.access
    }

    pub fn tracked_principals(&self) -> usize {
        self.states.len()
    }

    // ---------------------------------------------------------------------
    // Role administration
    // ---------------------------------------------------------------------

    pub fn add_limit_manager(&self, caller: Address, account: Address) -> GateResult<()> {
        self.grant(caller, Role::LimitManager, account)
    }

    pub fn remove_limit_manager(&self, caller: Address, account: Address) -> GateResult<()> {
        self.revoke(caller, Role::LimitManager, account)
    }

    /// Allow a service identity to consume quota on behalf of principals.
    pub fn authorize_caller(&self, caller: Address, account: Address) -> GateResult<()> {
        self.grant(caller, Role::Caller, account)
    }

    pub fn revoke_caller(&self, caller: Address, account: Address) -> GateResult<()> {
        self.revoke(caller, Role::Caller, account)
    }

    fn grant(&self, caller: Address, role: Role, account: Address) -> GateResult<()> {
        if self.access.grant(caller, role, account)? {
            self.events.emit(GateEvent::RoleGranted { role, account, sender: caller });
        }
        Ok(())
    }

    fn revoke(&self, caller: Address, role: Role, account: Address) -> GateResult<()> {
        if self.access.revoke(caller, role, account)? {
            self.events.emit(GateEvent::RoleRevoked { role, account, sender: caller });
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Asset defaults (ADMIN)
    // ---------------------------------------------------------------------

    /// Configured defaults for `asset`, or the fallback.
    pub fn default_limits(&self, asset: Address) -> LimitConfig {
        self.defaults
            .get(&asset)
            .map(|r| *r.value())
            .unwrap_or(self.fallback)
    }

    pub fn set_default_max_transfer_amount(&self, caller: Address, asset: Address, amount: U256) -> GateResult<()> {
        validate_amount(amount)?;
        self.update_defaults(caller, asset, |limits| limits.max_transfer_amount = amount)
    }

    pub fn set_default_cooldown(&self, caller: Address, asset: Address, cooldown: u64) -> GateResult<()> {
        self.update_defaults(caller, asset, |limits| limits.cooldown_period = cooldown)
    }

    pub fn set_default_period_limit(
        &self,
        caller: Address,
        asset: Address,
        limit: U256,
        duration: u64,
    ) -> GateResult<()> {
        validate_period(limit, duration)?;
        self.update_defaults(caller, asset, |limits| {
            limits.period_limit = limit;
            limits.period_duration = duration;
        })
    }

    /// Replace all four default dimensions at once.
    pub fn set_all_default_limits(&self, caller: Address, asset: Address, limits: LimitConfig) -> GateResult<()> {
        limits.validate()?;
        self.update_defaults(caller, asset, |current| *current = limits)
    }

    fn update_defaults(
        &self,
        caller: Address,
        asset: Address,
        update: impl FnOnce(&mut LimitConfig),
    ) -> GateResult<()> {
        self.access.require(Role::Admin, caller)?;
        let limits = {
            let mut entry = self.defaults.entry(asset).or_insert(self.fallback);
            update(entry.value_mut());
            *entry.value()
        };
        self.events.emit(GateEvent::DefaultLimitsUpdated { asset, limits });
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Principal overrides (LIMIT_MANAGER)
    // ---------------------------------------------------------------------

    pub fn set_user_max_transfer_amount(
        &self,
        caller: Address,
        asset: Address,
        account: Address,
        amount: U256,
    ) -> GateResult<()> {
        validate_amount(amount)?;
        self.update_user(caller, asset, account, |state| {
            state.custom.max_transfer_amount = amount;
            state.has_custom_cap = true;
        })
    }

    pub fn set_user_cooldown(&self, caller: Address, asset: Address, account: Address, cooldown: u64) -> GateResult<()> {
        self.update_user(caller, asset, account, |state| {
            state.custom.cooldown_period = cooldown;
            state.has_custom_cooldown = true;
        })
    }

    pub fn set_user_period_limit(
        &self,
        caller: Address,
        asset: Address,
        account: Address,
        limit: U256,
        duration: u64,
    ) -> GateResult<()> {
        validate_period(limit, duration)?;
        self.update_user(caller, asset, account, |state| {
            state.custom.period_limit = limit;
            state.custom.period_duration = duration;
            state.has_custom_period = true;
        })
    }

    /// Override all four dimensions for one principal at once.
    pub fn set_all_user_limits(
        &self,
        caller: Address,
        asset: Address,
        account: Address,
        limits: LimitConfig,
    ) -> GateResult<()> {
        limits.validate()?;
        self.update_user(caller, asset, account, |state| {
            state.custom = limits;
            state.has_custom_cap = true;
            state.has_custom_cooldown = true;
            state.has_custom_period = true;
        })
    }

    fn update_user(
        &self,
        caller: Address,
        asset: Address,
        account: Address,
        update: impl FnOnce(&mut PrincipalState),
    ) -> GateResult<()> {
        self.access.require(Role::LimitManager, caller)?;
        let defaults = self.default_limits(asset);
        let limits = {
            let mut state = self.states.entry((asset, account)).or_default();
            update(state.value_mut());
            state.effective(&defaults)
        };
        metrics::record_tracked_principals(self.states.len());
        self.events.emit(GateEvent::UserLimitsUpdated { asset, account, limits });
        Ok(())
    }

    /// Clear every override flag; counters are untouched.
    pub fn reset_user_to_default(&self, caller: Address, asset: Address, account: Address) -> GateResult<()> {
        self.access.require(Role::LimitManager, caller)?;
        if let Some(mut state) = self.states.get_mut(&(asset, account)) {
            state.clear_overrides();
        }
        self.events.emit(GateEvent::UserLimitsReset { asset, account });
        Ok(())
    }

    /// Force-clear the accounting window of one principal.
    pub fn reset_user_period(&self, caller: Address, asset: Address, account: Address) -> GateResult<()> {
        self.access.require(Role::LimitManager, caller)?;
        if let Some(mut state) = self.states.get_mut(&(asset, account)) {
            state.period_total = U256::ZERO;
            state.period_reset_at = 0;
        }
        self.events.emit(GateEvent::UserPeriodReset { asset, account });
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Exemptions (ADMIN)
    // ---------------------------------------------------------------------

    pub fn set_exemption(&self, caller: Address, asset: Address, account: Address, exempt: bool) -> GateResult<()> {
        self.batch_set_exemptions(caller, asset, &[account], &[exempt])
    }

    /// Apply `exempt[i]` to `accounts[i]`; arrays must be the same length.
    pub fn batch_set_exemptions(
        &self,
        caller: Address,
        asset: Address,
        accounts: &[Address],
        exempt: &[bool],
    ) -> GateResult<()> {
        self.access.require(Role::Admin, caller)?;
        if accounts.len() != exempt.len() {
            return Err(InvalidArgument::ArrayLengthMismatch {
                left: accounts.len(),
                right: exempt.len(),
            }
            .into());
        }

        for (account, exempt) in accounts.iter().zip(exempt) {
            self.states.entry((asset, *account)).or_default().exempt = *exempt;
        }
        metrics::record_tracked_principals(self.states.len());

        for (account, exempt) in accounts.iter().zip(exempt) {
            self.events.emit(GateEvent::ExemptionUpdated {
                asset,
                account: *account,
                exempt: *exempt,
            });
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Enforcement (CALLER)
    // ---------------------------------------------------------------------

    /// Pass and advance the cooldown timer, or fail with `CooldownNotElapsed`.
    ///
    /// Each success advances the timer: call at most once per logical transfer.
    pub fn enforce_cooldown(&self, caller: Address, asset: Address, account: Address) -> GateResult<()> {
        self.access.require(Role::Caller, caller)?;
        let defaults = self.default_limits(asset);
        let now = self.clock.now();

        let mut state = self.states.entry((asset, account)).or_default();
        if state.exempt {
            return Ok(());
        }
        let cooldown = state.effective(&defaults).cooldown_period;
        state.check_cooldown(cooldown, now)?;
        state.last_transfer_at = now;
        Ok(())
    }

    /// Consume `amount` of the principal's period quota.
    pub fn record_transfer(&self, caller: Address, asset: Address, account: Address, amount: U256) -> GateResult<()> {
        self.access.require(Role::Caller, caller)?;
        let defaults = self.default_limits(asset);
        let now = self.clock.now();

        let period_total = {
            let mut state = self.states.entry((asset, account)).or_default();
            if state.exempt {
                return Ok(());
            }
            let limits = state.effective(&defaults);
            let (period_total, reset_at) = state.plan_consumption(&limits, amount, now)?;
            state.period_total = period_total;
            state.period_reset_at = reset_at;
            period_total
        };

        metrics::record_tracked_principals(self.states.len());
        self.events.emit(GateEvent::TransferRecorded {
            asset,
            account,
            amount,
            period_total,
        });
        Ok(())
    }

    /// Cap, cooldown and quota as one atomic step.
    ///
    /// The checks run in that order against a single entry guard; both the
    /// timer and the quota are committed only when all three pass.
    pub fn admit(&self, caller: Address, asset: Address, account: Address, amount: U256) -> GateResult<()> {
        self.access.require(Role::Caller, caller)?;
        let defaults = self.default_limits(asset);
        let now = self.clock.now();

        let period_total = {
            let mut state = self.states.entry((asset, account)).or_default();
            if state.exempt {
                return Ok(());
            }
            let limits = state.effective(&defaults);
            if amount > limits.max_transfer_amount {
                return Err(GateError::LimitExceeded {
                    amount,
                    max: limits.max_transfer_amount,
                });
            }
            state.check_cooldown(limits.cooldown_period, now)?;
            let (period_total, reset_at) = state.plan_consumption(&limits, amount, now)?;

            state.last_transfer_at = now;
            state.period_total = period_total;
            state.period_reset_at = reset_at;
            period_total
        };

        metrics::record_tracked_principals(self.states.len());
        self.events.emit(GateEvent::TransferRecorded {
            asset,
            account,
            amount,
            period_total,
        });
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    fn state(&self, asset: Address, account: Address) -> PrincipalState {
        self.states
            .get(&(asset, account))
            .map(|r| *r.value())
            .unwrap_or_default()
    }

    /// Stored state, if the pair has ever been touched.
    pub fn principal_state(&self, asset: Address, account: Address) -> Option<PrincipalState> {
        self.states.get(&(asset, account)).map(|r| *r.value())
    }

    pub fn is_exempt(&self, asset: Address, account: Address) -> bool {
        self.state(asset, account).exempt
    }

    /// `exempt || amount <= effective cap`. Never mutates.
    pub fn check_transfer_limit(&self, asset: Address, account: Address, amount: U256) -> bool {
        let state = self.state(asset, account);
        state.exempt || amount <= state.effective(&self.default_limits(asset)).max_transfer_amount
    }

    /// Effective limits. Exempt principals resolve to no cap, cooldown or quota.
    pub fn effective_limits(&self, asset: Address, account: Address) -> LimitConfig {
        let state = self.state(asset, account);
        let effective = state.effective(&self.default_limits(asset));
        if state.exempt {
            LimitConfig {
                period_duration: effective.period_duration,
                ..LimitConfig::unlimited()
            }
        } else {
            effective
        }
    }

    pub fn get_effective_max_transfer_amount(&self, asset: Address, account: Address) -> U256 {
        self.effective_limits(asset, account).max_transfer_amount
    }

    pub fn get_effective_cooldown_period(&self, asset: Address, account: Address) -> u64 {
        self.effective_limits(asset, account).cooldown_period
    }

    pub fn get_effective_period_limit(&self, asset: Address, account: Address) -> U256 {
        self.effective_limits(asset, account).period_limit
    }

    pub fn get_effective_period_duration(&self, asset: Address, account: Address) -> u64 {
        self.effective_limits(asset, account).period_duration
    }

    /// `(remaining, reset_at)` for the current window.
    ///
    /// A stale or never-opened window is rotated the way the next transfer
    /// would rotate it: the full limit, resetting at `now + period_duration`.
    pub fn get_remaining_period_allowance(&self, asset: Address, account: Address) -> (U256, u64) {
        let state = self.state(asset, account);
        if state.exempt {
            return (U256::MAX, 0);
        }
        let limits = state.effective(&self.default_limits(asset));
        let (period_total, reset_at) = state.window_at(limits.period_duration, self.clock.now());
        (limits.period_limit.saturating_sub(period_total), reset_at)
    }

    /// `0` if a transfer would pass the cooldown now, else the earliest time it would.
    pub fn get_next_valid_transfer_time(&self, asset: Address, account: Address) -> u64 {
        let state = self.state(asset, account);
        if state.exempt {
            return 0;
        }
        let cooldown = state.effective(&self.default_limits(asset)).cooldown_period;
        match state.cooldown_until(cooldown) {
            Some(next) if self.clock.now() < next => next,
            _ => 0,
        }
    }

    /// Everything an operator wants to know about one principal.
    pub fn view(&self, asset: Address, account: Address) -> PrincipalView {
        let (remaining_allowance, period_reset_at) = self.get_remaining_period_allowance(asset, account);
        PrincipalView {
            asset,
            account,
            exempt: self.is_exempt(asset, account),
            effective: self.effective_limits(asset, account),
            remaining_allowance,
            period_reset_at,
            next_valid_transfer_time: self.get_next_valid_transfer_time(asset, account),
        }
    }
}
