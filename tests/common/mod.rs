//! Shared fixtures for integration tests.

#![allow(dead_code)]

use alloy::primitives::{Address, U256};
use std::sync::Arc;

use ledger_gate::clock::MockClock;
use ledger_gate::events::EventBus;
use ledger_gate::gate::LedgerGate;
use ledger_gate::limiter::{LimitConfig, RateLimiter};
use ledger_gate::whitelist::WhitelistRegistry;

pub const ADMIN: Address = Address::repeat_byte(0xad);
pub const GATE: Address = Address::repeat_byte(0x6a);
pub const WHITELISTER: Address = Address::repeat_byte(0x31);
pub const MANAGER: Address = Address::repeat_byte(0x3a);
pub const MINTER: Address = Address::repeat_byte(0x4d);

pub const TOKEN: Address = Address::repeat_byte(0x70);
pub const OTHER_TOKEN: Address = Address::repeat_byte(0x71);

pub const ALICE: Address = Address::repeat_byte(0xa1);
pub const BOB: Address = Address::repeat_byte(0xb0);
pub const CAROL: Address = Address::repeat_byte(0xc0);
pub const MALLORY: Address = Address::repeat_byte(0xee);

pub const START: u64 = 1_700_000_000;

/// `{max: 1000, cooldown: 60, periodLimit: 2000, periodDuration: 86400}`.
pub fn standard_limits() -> LimitConfig {
    LimitConfig {
        max_transfer_amount: U256::from(1000),
        cooldown_period: 60,
        period_limit: U256::from(2000),
        period_duration: 86_400,
    }
}

pub fn amount(n: u64) -> U256 {
    U256::from(n)
}

/// A fully wired gate driven by a mock clock.
pub struct Harness {
    pub clock: MockClock,
    pub events: EventBus,
    pub gate: Arc<LedgerGate>,
}

impl Harness {
    pub fn whitelist(&self) -> Arc<WhitelistRegistry> {
        self.gate.whitelist()
    }

    pub fn limiter(&self) -> Arc<RateLimiter> {
        self.gate.limiter()
    }

    /// Credit `account` without touching its limiter state.
    pub fn fund(&self, account: Address, value: u64) {
        let settings = self.gate.settings();
        self.gate
            .update_config(ADMIN, false, settings.whitelist_checks_enabled)
            .unwrap();
        self.gate.mint(MINTER, TOKEN, account, amount(value)).unwrap();
        self.gate
            .update_config(ADMIN, settings.limit_checks_enabled, settings.whitelist_checks_enabled)
            .unwrap();
    }

    pub fn balance(&self, account: Address) -> U256 {
        self.gate.balance_of(TOKEN, account)
    }

    pub fn period_total(&self, account: Address) -> U256 {
        self.limiter()
            .principal_state(TOKEN, account)
            .map(|s| s.period_total)
            .unwrap_or_default()
    }
}

/// Build a whitelist, limiter and gate with every role assigned and
/// ALICE, BOB, CAROL and MINTER whitelisted. `TOKEN` uses `limits`.
pub fn harness(limits: LimitConfig) -> Harness {
    let clock = MockClock::new(START);
    let events = EventBus::new();

    let whitelist = Arc::new(WhitelistRegistry::new(ADMIN, events.clone()).unwrap());
    whitelist.add_whitelister(ADMIN, WHITELISTER).unwrap();
    whitelist
        .batch_set_whitelisted(WHITELISTER, &[ALICE, BOB, CAROL, MINTER], true)
        .unwrap();

    let limiter = Arc::new(
        RateLimiter::new(ADMIN, LimitConfig::unlimited(), Arc::new(clock.clone()), events.clone()).unwrap(),
    );
    limiter.authorize_caller(ADMIN, GATE).unwrap();
    limiter.add_limit_manager(ADMIN, MANAGER).unwrap();
    limiter.set_all_default_limits(ADMIN, TOKEN, limits).unwrap();

    let gate = LedgerGate::new(GATE, ADMIN, whitelist, limiter, events.clone()).unwrap();
    gate.add_minter(ADMIN, MINTER).unwrap();

    Harness {
        clock,
        events,
        gate: Arc::new(gate),
    }
}
