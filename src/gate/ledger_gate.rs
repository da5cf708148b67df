//! Admission decision for every balance-changing operation.
//!
//! Sequence per operation:
//! pause → whitelist → cap → cooldown → period quota → balance mutation.
//! Any rejection aborts the whole operation with nothing committed.

use alloy::primitives::{Address, U256};
use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::access::{AccessControl, Role, RoleGrant};
use crate::error::{GateError, GateResult, InvalidArgument};
use crate::events::{Collaborator, EventBus, GateEvent};
use crate::gate::ledger::{BalanceRecord, Ledger};
use crate::limiter::{LimiterSnapshot, RateLimiter};
use crate::observability::metrics;
use crate::whitelist::{WhitelistRegistry, WhitelistSnapshot};

/// Global gate switches, read as one consistent snapshot per decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateSettings {
    pub paused: bool,
    pub whitelist_checks_enabled: bool,
    pub limit_checks_enabled: bool,
    /// Bumped on every change.
    pub version: u64,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            paused: false,
            whitelist_checks_enabled: true,
            limit_checks_enabled: true,
            version: 0,
        }
    }
}

/// Operation label for logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Transfer,
    TransferFrom,
    Mint,
    Burn,
    Admit,
    Consume,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Transfer => "transfer",
            Operation::TransferFrom => "transfer_from",
            Operation::Mint => "mint",
            Operation::Burn => "burn",
            Operation::Admit => "admit",
            Operation::Consume => "consume",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted form of a [`LedgerGate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateSnapshot {
    pub settings: GateSettings,
    pub roles: Vec<RoleGrant>,
    pub balances: Vec<BalanceRecord>,
}

/// Composes the whitelist and the limiter in front of the balance ledger.
///
/// The gate acts toward the limiter under its own service `identity`, which
/// must hold [`Role::Caller`] there. End users never reach the limiter's
/// mutating entry points directly.
pub struct LedgerGate {
    identity: Address,
    settings: ArcSwap<GateSettings>,
    whitelist: ArcSwap<WhitelistRegistry>,
    limiter: ArcSwap<RateLimiter>,
    ledger: Mutex<Ledger>,
    access: AccessControl,
    events: EventBus,
}

impl fmt::Debug for LedgerGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedgerGate")
            .field("identity", &self.identity)
            .field("settings", &self.settings())
            .finish()
    }
}

impl LedgerGate {
    pub fn new(
        identity: Address,
        admin: Address,
        whitelist: Arc<WhitelistRegistry>,
        limiter: Arc<RateLimiter>,
        events: EventBus,
    ) -> GateResult<Self> {
        if identity == Address::ZERO {
            return Err(InvalidArgument::ZeroAddress.into());
        }
        Ok(Self {
            identity,
            settings: ArcSwap::from_pointee(GateSettings::default()),
            whitelist: ArcSwap::new(whitelist),
            limiter: ArcSwap::new(limiter),
            ledger: Mutex::new(Ledger::new()),
            access: AccessControl::new(admin)?,
            events,
        })
    }

    /// Restore a gate from a snapshot around already restored collaborators.
    pub fn from_snapshot(
        identity: Address,
        snapshot: GateSnapshot,
        whitelist: Arc<WhitelistRegistry>,
        limiter: Arc<RateLimiter>,
        events: EventBus,
    ) -> GateResult<Self> {
        Ok(Self {
            identity,
            settings: ArcSwap::from_pointee(snapshot.settings),
            whitelist: ArcSwap::new(whitelist),
            limiter: ArcSwap::new(limiter),
            ledger: Mutex::new(Ledger::from_records(snapshot.balances)?),
            access: AccessControl::from_grants(snapshot.roles),
            events,
        })
    }

    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().expect("ledger mutex poisoned")
    }

    pub fn snapshot(&self) -> GateSnapshot {
        self.snapshot_of(&self.ledger())
    }

    fn snapshot_of(&self, ledger: &Ledger) -> GateSnapshot {
        GateSnapshot {
            settings: self.settings(),
            roles: self.access.grants(),
            balances: ledger.records(),
        }
    }

    /// Whitelist, limiter and gate state captured under the ledger lock.
    ///
    /// Balance-changing operations commit their quota and their balances
    /// under the same lock, so the two always agree in the result.
    pub fn capture(&self) -> (WhitelistSnapshot, LimiterSnapshot, GateSnapshot) {
        let ledger = self.ledger();
        let whitelist = self.whitelist().snapshot();
        let limiter = self.limiter().snapshot();
        (whitelist, limiter, self.snapshot_of(&ledger))
    }

    pub fn identity(&self) -> Address {
        self.identity
    }

    pub fn access(&self) -> &AccessControl {
        &self.access
    }

    pub fn settings(&self) -> GateSettings {
        **self.settings.load()
    }

    pub fn whitelist(&self) -> Arc<WhitelistRegistry> {
        self.whitelist.load_full()
    }

    pub fn limiter(&self) -> Arc<RateLimiter> {
        self.limiter.load_full()
    }

    pub fn balance_of(&self, asset: Address, account: Address) -> U256 {
        self.ledger().balance_of(asset, account)
    }

    pub fn total_supply(&self, asset: Address) -> U256 {
        self.ledger().total_supply(asset)
    }

    // ---------------------------------------------------------------------
    // Admission
    // ---------------------------------------------------------------------

    /// Pause and whitelist checks against one settings snapshot.
    fn check_access(
        &self,
        settings: &GateSettings,
        whitelist: &WhitelistRegistry,
        principals: &[Address],
    ) -> GateResult<()> {
        if settings.paused {
            return Err(GateError::Paused);
        }
        if settings.whitelist_checks_enabled {
            if let Some(denied) = principals.iter().find(|p| !whitelist.is_whitelisted(**p)) {
                return Err(GateError::NotWhitelisted(*denied));
            }
        }
        Ok(())
    }

    /// Full admission for `subject`: access checks, then cap, cooldown and quota.
    ///
    /// `gated` lists every principal that must be whitelisted, subject first.
    fn admit(
        &self,
        operation: Operation,
        asset: Address,
        subject: Address,
        gated: &[Address],
        amount: U256,
        precheck: impl FnOnce() -> GateResult<()>,
    ) -> GateResult<()> {
        let settings = self.settings();
        let whitelist = self.whitelist.load();
        let limiter = self.limiter.load();

        let result = self.check_access(&settings, &whitelist, gated).and_then(|_| precheck()).and_then(|_| {
            if settings.limit_checks_enabled {
                limiter.admit(self.identity, asset, subject, amount)
            } else {
                Ok(())
            }
        });
        self.observe(operation, asset, subject, amount, &result);
        result
    }

    fn observe(&self, operation: Operation, asset: Address, subject: Address, amount: U256, result: &GateResult<()>) {
        match result {
            Ok(()) => {
                metrics::record_admission(operation.as_str(), "admitted");
                tracing::debug!(%operation, %asset, %subject, %amount, "admitted");
            }
            Err(err) => {
                metrics::record_admission(operation.as_str(), "rejected");
                metrics::record_rejection(err.reason());
                tracing::warn!(%operation, %asset, %subject, %amount, error = %err, "rejected");
            }
        }
    }

    /// Preview of [`Self::transfer`] without any mutation.
    pub fn check_transfer(&self, asset: Address, from: Address, to: Address, amount: U256) -> GateResult<()> {
        let settings = self.settings();
        self.check_access(&settings, &self.whitelist.load(), &[from, to])?;
        if !settings.limit_checks_enabled {
            return Ok(());
        }

        let limiter = self.limiter.load();
        if !limiter.check_transfer_limit(asset, from, amount) {
            return Err(GateError::LimitExceeded {
                amount,
                max: limiter.get_effective_max_transfer_amount(asset, from),
            });
        }
        let next_allowed_at = limiter.get_next_valid_transfer_time(asset, from);
        if next_allowed_at != 0 {
            return Err(GateError::CooldownNotElapsed { next_allowed_at });
        }
        let (remaining, _) = limiter.get_remaining_period_allowance(asset, from);
        if amount > remaining {
            let period_limit = limiter.get_effective_period_limit(asset, from);
            return Err(GateError::ExceedsPeriodLimit {
                requested: amount,
                period_total: period_limit.saturating_sub(remaining),
                period_limit,
            });
        }
        Ok(())
    }

    /// May `principal` send `asset` right now? Pure.
    pub fn is_allowed_sender(&self, asset: Address, principal: Address) -> bool {
        let settings = self.settings();
        if self.check_access(&settings, &self.whitelist.load(), &[principal]).is_err() {
            return false;
        }
        !settings.limit_checks_enabled || self.limiter.load().get_next_valid_transfer_time(asset, principal) == 0
    }

    /// Would a transfer pass every check right now? Pure.
    pub fn is_allowed_transfer(&self, asset: Address, from: Address, to: Address, amount: U256) -> bool {
        self.check_transfer(asset, from, to, amount).is_ok()
    }

    /// Run the full admission for a transfer and consume cooldown and quota,
    /// without moving balances.
    pub fn admit_transfer(&self, asset: Address, from: Address, to: Address, amount: U256) -> GateResult<()> {
        self.admit(Operation::Admit, asset, from, &[from, to], amount, || Ok(()))
    }

    /// Commit quota consumption after an earlier pre-check.
    pub fn record_consumption(&self, asset: Address, principal: Address, amount: U256) -> GateResult<()> {
        let settings = self.settings();
        let result = if settings.paused {
            Err(GateError::Paused)
        } else if settings.limit_checks_enabled {
            self.limiter.load().record_transfer(self.identity, asset, principal, amount)
        } else {
            Ok(())
        };
        self.observe(Operation::Consume, asset, principal, amount, &result);
        result
    }

    // ---------------------------------------------------------------------
    // Balance-changing operations
    // ---------------------------------------------------------------------

    pub fn transfer(&self, asset: Address, from: Address, to: Address, amount: U256) -> GateResult<()> {
        let mut ledger = self.ledger();
        self.admit(Operation::Transfer, asset, from, &[from, to], amount, || {
            ledger.ensure_balance(asset, from, amount)
        })?;
        ledger.move_balance(asset, from, to, amount)?;
        drop(ledger);

        self.events.emit(GateEvent::Transfer { asset, from, to, amount });
        Ok(())
    }

    /// Transfer initiated by `spender` on behalf of `from`.
    ///
    /// Allowances are not tracked; the spender is only whitelist-checked.
    pub fn transfer_from(
        &self,
        asset: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> GateResult<()> {
        let mut ledger = self.ledger();
        self.admit(Operation::TransferFrom, asset, from, &[from, to, spender], amount, || {
            ledger.ensure_balance(asset, from, amount)
        })?;
        ledger.move_balance(asset, from, to, amount)?;
        drop(ledger);

        self.events.emit(GateEvent::Transfer { asset, from, to, amount });
        Ok(())
    }

    /// Create `amount` for `to`. Requires MINTER; limits apply to `to`.
    pub fn mint(&self, caller: Address, asset: Address, to: Address, amount: U256) -> GateResult<()> {
        self.access.require(Role::Minter, caller)?;
        if to == Address::ZERO {
            return Err(InvalidArgument::ZeroAddress.into());
        }
        let mut ledger = self.ledger();
        self.admit(Operation::Mint, asset, to, &[to], amount, || {
            ledger.ensure_credit(asset, to, amount)
        })?;
        ledger.credit(asset, to, amount)?;
        drop(ledger);

        self.events.emit(GateEvent::Transfer {
            asset,
            from: Address::ZERO,
            to,
            amount,
        });
        Ok(())
    }

    /// Destroy `amount` held by `from`.
    pub fn burn(&self, asset: Address, from: Address, amount: U256) -> GateResult<()> {
        let mut ledger = self.ledger();
        self.admit(Operation::Burn, asset, from, &[from], amount, || {
            ledger.ensure_balance(asset, from, amount)
        })?;
        ledger.debit(asset, from, amount)?;
        drop(ledger);

        self.events.emit(GateEvent::Transfer {
            asset,
            from,
            to: Address::ZERO,
            amount,
        });
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Administration (ADMIN)
    // ---------------------------------------------------------------------

    pub fn add_minter(&self, caller: Address, account: Address) -> GateResult<()> {
        if self.access.grant(caller, Role::Minter, account)? {
            self.events.emit(GateEvent::RoleGranted {
                role: Role::Minter,
                account,
                sender: caller,
            });
        }
        Ok(())
    }

    pub fn remove_minter(&self, caller: Address, account: Address) -> GateResult<()> {
        if self.access.revoke(caller, Role::Minter, account)? {
            self.events.emit(GateEvent::RoleRevoked {
                role: Role::Minter,
                account,
                sender: caller,
            });
        }
        Ok(())
    }

    fn update_settings(&self, update: impl Fn(&mut GateSettings)) -> GateSettings {
        let previous = self.settings.rcu(|current| {
            let mut next = **current;
            update(&mut next);
            next.version = current.version + 1;
            next
        });
        let mut next = *previous;
        update(&mut next);
        next.version = previous.version + 1;
        next
    }

    pub fn update_config(
        &self,
        caller: Address,
        limit_checks_enabled: bool,
        whitelist_checks_enabled: bool,
    ) -> GateResult<()> {
        self.access.require(Role::Admin, caller)?;
        let settings = self.update_settings(|s| {
            s.limit_checks_enabled = limit_checks_enabled;
            s.whitelist_checks_enabled = whitelist_checks_enabled;
        });
        tracing::info!(version = settings.version, "gate config updated");
        self.events.emit(GateEvent::ConfigUpdated {
            limit_checks_enabled,
            whitelist_checks_enabled,
        });
        Ok(())
    }

    pub fn pause(&self, caller: Address) -> GateResult<()> {
        self.access.require(Role::Admin, caller)?;
        self.update_settings(|s| s.paused = true);
        self.events.emit(GateEvent::Paused { account: caller });
        Ok(())
    }

    pub fn unpause(&self, caller: Address) -> GateResult<()> {
        self.access.require(Role::Admin, caller)?;
        self.update_settings(|s| s.paused = false);
        self.events.emit(GateEvent::Unpaused { account: caller });
        Ok(())
    }

    /// Swap the backing whitelist registry.
    pub fn set_whitelist_manager(&self, caller: Address, whitelist: Arc<WhitelistRegistry>) -> GateResult<()> {
        self.access.require(Role::Admin, caller)?;
        self.whitelist.store(whitelist);
        self.events.emit(GateEvent::CollaboratorReplaced {
            collaborator: Collaborator::WhitelistManager,
        });
        Ok(())
    }

    /// Swap the backing limiter. The gate identity must be a CALLER there.
    pub fn set_transfer_limiter(&self, caller: Address, limiter: Arc<RateLimiter>) -> GateResult<()> {
        self.access.require(Role::Admin, caller)?;
        self.limiter.store(limiter);
        self.events.emit(GateEvent::CollaboratorReplaced {
            collaborator: Collaborator::TransferLimiter,
        });
        Ok(())
    }

    /// Sweep `amount` of an asset held by the gate's own account to `to`.
    pub fn recover_erc20(&self, caller: Address, asset: Address, to: Address, amount: U256) -> GateResult<()> {
        self.access.require(Role::Admin, caller)?;
        if to == Address::ZERO {
            return Err(InvalidArgument::ZeroAddress.into());
        }
        if to == self.identity {
            return Err(InvalidArgument::SelfRecovery.into());
        }
        self.ledger().move_balance(asset, self.identity, to, amount)?;
        self.events.emit(GateEvent::TokensRecovered { asset, to, amount });
        Ok(())
    }

    /// Credit the gate's own account, e.g. when tokens were sent to it by mistake.
    pub fn deposit_to_gate(&self, asset: Address, amount: U256) -> GateResult<()> {
        self.ledger().credit(asset, self.identity, amount)
    }
}
