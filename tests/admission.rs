//! End-to-end admission through the ledger gate.

mod common;

use alloy::primitives::{Address, U256};
use std::sync::Arc;

use common::*;
use ledger_gate::error::{GateError, InvalidArgument};
use ledger_gate::events::GateEvent;
use ledger_gate::limiter::{LimitConfig, RateLimiter};
use ledger_gate::whitelist::WhitelistRegistry;

#[test]
fn test_cooldown_then_quota_scenario() {
    let h = harness(standard_limits());

    h.gate.admit_transfer(TOKEN, ALICE, BOB, amount(500)).unwrap();
    assert_eq!(h.period_total(ALICE), amount(500));

    let err = h.gate.admit_transfer(TOKEN, ALICE, BOB, amount(1)).unwrap_err();
    assert_eq!(
        err,
        GateError::CooldownNotElapsed {
            next_allowed_at: START + 60
        }
    );
    assert_eq!(h.period_total(ALICE), amount(500));

    h.clock.advance(61);
    h.gate.admit_transfer(TOKEN, ALICE, BOB, amount(600)).unwrap();
    assert_eq!(h.period_total(ALICE), amount(1100));

    h.clock.advance(61);
    let err = h.gate.admit_transfer(TOKEN, ALICE, BOB, amount(1000)).unwrap_err();
    assert_eq!(
        err,
        GateError::ExceedsPeriodLimit {
            requested: amount(1000),
            period_total: amount(1100),
            period_limit: amount(2000),
        }
    );
    assert_eq!(h.period_total(ALICE), amount(1100));
}

#[test]
fn test_rejected_transfer_moves_nothing() {
    let h = harness(standard_limits());
    h.fund(ALICE, 5_000);

    h.gate.transfer(TOKEN, ALICE, BOB, amount(500)).unwrap();
    assert_eq!(h.balance(ALICE), amount(4_500));
    assert_eq!(h.balance(BOB), amount(500));

    let last = h.limiter().principal_state(TOKEN, ALICE).unwrap().last_transfer_at;
    assert!(matches!(
        h.gate.transfer(TOKEN, ALICE, BOB, amount(1)),
        Err(GateError::CooldownNotElapsed { .. })
    ));
    assert_eq!(h.balance(ALICE), amount(4_500));
    assert_eq!(h.balance(BOB), amount(500));
    assert_eq!(h.limiter().principal_state(TOKEN, ALICE).unwrap().last_transfer_at, last);
}

#[test]
fn test_cap_checked_before_cooldown() {
    let h = harness(standard_limits());
    h.fund(ALICE, 5_000);

    let err = h.gate.transfer(TOKEN, ALICE, BOB, amount(1001)).unwrap_err();
    assert_eq!(
        err,
        GateError::LimitExceeded {
            amount: amount(1001),
            max: amount(1000)
        }
    );
    // A rejected cap leaves the cooldown timer untouched.
    h.gate.transfer(TOKEN, ALICE, BOB, amount(1000)).unwrap();
}

#[test]
fn test_insufficient_balance_consumes_no_quota() {
    let h = harness(standard_limits());
    h.fund(ALICE, 100);

    let err = h.gate.transfer(TOKEN, ALICE, BOB, amount(500)).unwrap_err();
    assert!(matches!(err, GateError::InsufficientBalance { .. }));
    assert_eq!(h.period_total(ALICE), U256::ZERO);
    assert!(h.gate.is_allowed_sender(TOKEN, ALICE));
}

#[test]
fn test_paused_rejects_everything() {
    let h = harness(standard_limits());
    h.fund(ALICE, 1_000);
    h.gate.pause(ADMIN).unwrap();

    assert_eq!(h.gate.transfer(TOKEN, ALICE, BOB, amount(1)), Err(GateError::Paused));
    assert_eq!(h.gate.mint(MINTER, TOKEN, ALICE, amount(1)), Err(GateError::Paused));
    assert_eq!(h.gate.burn(TOKEN, ALICE, amount(1)), Err(GateError::Paused));
    assert_eq!(h.gate.record_consumption(TOKEN, ALICE, amount(1)), Err(GateError::Paused));
    assert!(!h.gate.is_allowed_sender(TOKEN, ALICE));

    h.gate.unpause(ADMIN).unwrap();
    h.gate.transfer(TOKEN, ALICE, BOB, amount(1)).unwrap();
}

#[test]
fn test_pause_requires_admin() {
    let h = harness(standard_limits());
    assert!(matches!(h.gate.pause(MALLORY), Err(GateError::Unauthorized { .. })));
    assert!(!h.gate.settings().paused);
}

#[test]
fn test_sender_and_receiver_whitelisted() {
    let h = harness(standard_limits());
    h.fund(ALICE, 1_000);

    assert_eq!(
        h.gate.transfer(TOKEN, ALICE, MALLORY, amount(10)),
        Err(GateError::NotWhitelisted(MALLORY))
    );
    assert_eq!(
        h.gate.transfer(TOKEN, MALLORY, ALICE, amount(10)),
        Err(GateError::NotWhitelisted(MALLORY))
    );
    assert_eq!(h.period_total(ALICE), U256::ZERO);

    h.gate.update_config(ADMIN, true, false).unwrap();
    h.gate.transfer(TOKEN, ALICE, MALLORY, amount(10)).unwrap();
    assert_eq!(h.gate.balance_of(TOKEN, MALLORY), amount(10));
}

#[test]
fn test_registry_disable_bypasses_membership() {
    let h = harness(standard_limits());
    assert!(!h.gate.is_allowed_transfer(TOKEN, ALICE, MALLORY, amount(1)));

    h.whitelist().toggle_whitelisting(ADMIN, false).unwrap();
    assert!(h.gate.is_allowed_transfer(TOKEN, ALICE, MALLORY, amount(1)));

    h.whitelist().toggle_whitelisting(ADMIN, true).unwrap();
    assert!(!h.gate.is_allowed_transfer(TOKEN, ALICE, MALLORY, amount(1)));
}

#[test]
fn test_transfer_from_checks_spender() {
    let h = harness(standard_limits());
    h.fund(ALICE, 1_000);

    assert_eq!(
        h.gate.transfer_from(TOKEN, MALLORY, ALICE, BOB, amount(10)),
        Err(GateError::NotWhitelisted(MALLORY))
    );
    h.gate.transfer_from(TOKEN, CAROL, ALICE, BOB, amount(10)).unwrap();
    // Limits apply to the owner, not the spender.
    assert_eq!(h.period_total(ALICE), amount(10));
    assert_eq!(h.period_total(CAROL), U256::ZERO);
}

#[test]
fn test_mint_and_burn() {
    let h = harness(standard_limits());

    assert!(matches!(
        h.gate.mint(ALICE, TOKEN, ALICE, amount(10)),
        Err(GateError::Unauthorized { .. })
    ));
    assert_eq!(
        h.gate.mint(MINTER, TOKEN, Address::ZERO, amount(10)),
        Err(InvalidArgument::ZeroAddress.into())
    );

    h.gate.mint(MINTER, TOKEN, ALICE, amount(800)).unwrap();
    assert_eq!(h.gate.total_supply(TOKEN), amount(800));
    assert_eq!(h.period_total(ALICE), amount(800));

    h.clock.advance(60);
    h.gate.burn(TOKEN, ALICE, amount(300)).unwrap();
    assert_eq!(h.balance(ALICE), amount(500));
    assert_eq!(h.gate.total_supply(TOKEN), amount(500));
    assert_eq!(h.period_total(ALICE), amount(1100));
}

#[test]
fn test_mint_past_supply_ceiling_is_rejected() {
    let h = harness(standard_limits());
    h.gate.update_config(ADMIN, false, true).unwrap();
    h.gate.mint(MINTER, TOKEN, ALICE, U256::MAX).unwrap();
    h.gate.update_config(ADMIN, true, true).unwrap();

    assert_eq!(
        h.gate.mint(MINTER, TOKEN, BOB, amount(5)),
        Err(GateError::SupplyOverflow { asset: TOKEN, amount: amount(5) })
    );
    assert_eq!(h.gate.total_supply(TOKEN), U256::MAX);
    assert_eq!(h.balance(BOB), U256::ZERO);
    // the rejected mint did not open BOB's window or start his cooldown
    assert_eq!(h.period_total(BOB), U256::ZERO);
    assert_eq!(h.limiter().get_next_valid_transfer_time(TOKEN, BOB), 0);

    h.gate.burn(TOKEN, ALICE, amount(5)).unwrap();
    h.gate.mint(MINTER, TOKEN, BOB, amount(5)).unwrap();
    assert_eq!(h.gate.total_supply(TOKEN), U256::MAX);
}

#[test]
fn test_exempt_principal_passes_limits_not_whitelist() {
    let h = harness(standard_limits());
    h.fund(ALICE, 10_000);
    h.limiter().set_exemption(ADMIN, TOKEN, ALICE, true).unwrap();

    for _ in 0..3 {
        h.gate.transfer(TOKEN, ALICE, BOB, amount(2_500)).unwrap();
    }
    assert_eq!(h.balance(BOB), amount(7_500));
    assert_eq!(
        h.gate.transfer(TOKEN, ALICE, MALLORY, amount(1)),
        Err(GateError::NotWhitelisted(MALLORY))
    );
}

#[test]
fn test_limit_checks_disabled() {
    let h = harness(standard_limits());
    h.gate.update_config(ADMIN, false, true).unwrap();

    h.gate.admit_transfer(TOKEN, ALICE, BOB, amount(5_000)).unwrap();
    h.gate.admit_transfer(TOKEN, ALICE, BOB, amount(5_000)).unwrap();
    assert_eq!(h.period_total(ALICE), U256::ZERO);
}

#[test]
fn test_two_phase_consumption() {
    let h = harness(standard_limits());

    assert!(!h.gate.is_allowed_transfer(TOKEN, ALICE, BOB, amount(1500)));
    assert!(h.gate.is_allowed_transfer(TOKEN, ALICE, BOB, amount(900)));
    h.gate.record_consumption(TOKEN, ALICE, amount(900)).unwrap();
    h.gate.record_consumption(TOKEN, ALICE, amount(900)).unwrap();
    assert_eq!(h.period_total(ALICE), amount(1800));

    assert!(matches!(
        h.gate.record_consumption(TOKEN, ALICE, amount(300)),
        Err(GateError::ExceedsPeriodLimit { .. })
    ));
    assert_eq!(h.period_total(ALICE), amount(1800));
}

#[test]
fn test_previews_do_not_mutate() {
    let h = harness(standard_limits());
    assert!(h.gate.is_allowed_transfer(TOKEN, ALICE, BOB, amount(100)));
    assert!(h.gate.is_allowed_sender(TOKEN, ALICE));
    assert!(h.limiter().principal_state(TOKEN, ALICE).is_none());
    assert_eq!(h.gate.check_transfer(TOKEN, ALICE, BOB, amount(100)), Ok(()));
}

#[test]
fn test_period_rotates_lazily() {
    let h = harness(standard_limits());

    h.gate.admit_transfer(TOKEN, ALICE, BOB, amount(1000)).unwrap();
    h.clock.advance(60);
    h.gate.admit_transfer(TOKEN, ALICE, BOB, amount(1000)).unwrap();
    assert_eq!(h.period_total(ALICE), amount(2000));

    h.clock.advance(86_400);
    let (remaining, _) = h.limiter().get_remaining_period_allowance(TOKEN, ALICE);
    assert_eq!(remaining, amount(2000));

    h.gate.admit_transfer(TOKEN, ALICE, BOB, amount(700)).unwrap();
    assert_eq!(h.period_total(ALICE), amount(700));
}

#[test]
fn test_assets_are_independent() {
    let h = harness(standard_limits());

    h.gate.admit_transfer(TOKEN, ALICE, BOB, amount(100)).unwrap();
    // OTHER_TOKEN falls back to the unlimited configuration.
    h.gate.admit_transfer(OTHER_TOKEN, ALICE, BOB, amount(1_000_000)).unwrap();
    h.gate.admit_transfer(OTHER_TOKEN, ALICE, BOB, amount(1_000_000)).unwrap();
    assert_eq!(h.period_total(ALICE), amount(100));
}

#[test]
fn test_replace_limiter() {
    let h = harness(standard_limits());
    h.gate.admit_transfer(TOKEN, ALICE, BOB, amount(100)).unwrap();

    let strict = LimitConfig {
        max_transfer_amount: amount(10),
        ..standard_limits()
    };
    let replacement = Arc::new(
        RateLimiter::new(ADMIN, LimitConfig::unlimited(), Arc::new(h.clock.clone()), h.events.clone()).unwrap(),
    );
    replacement.set_all_default_limits(ADMIN, TOKEN, strict).unwrap();

    assert!(matches!(
        h.gate.set_transfer_limiter(MALLORY, replacement.clone()),
        Err(GateError::Unauthorized { .. })
    ));

    let mut events = h.events.subscribe();
    h.gate.set_transfer_limiter(ADMIN, replacement.clone()).unwrap();
    assert!(matches!(
        events.try_recv().unwrap(),
        GateEvent::CollaboratorReplaced { .. }
    ));

    // The gate identity is not yet a CALLER on the new limiter.
    assert!(matches!(
        h.gate.admit_transfer(TOKEN, BOB, ALICE, amount(5)),
        Err(GateError::Unauthorized { .. })
    ));
    replacement.authorize_caller(ADMIN, GATE).unwrap();
    h.gate.admit_transfer(TOKEN, BOB, ALICE, amount(5)).unwrap();
    assert_eq!(
        h.gate.admit_transfer(TOKEN, CAROL, ALICE, amount(11)),
        Err(GateError::LimitExceeded {
            amount: amount(11),
            max: amount(10)
        })
    );
}

#[test]
fn test_replace_whitelist() {
    let h = harness(standard_limits());
    let open = Arc::new(WhitelistRegistry::new(ADMIN, h.events.clone()).unwrap());
    open.toggle_whitelisting(ADMIN, false).unwrap();

    h.gate.set_whitelist_manager(ADMIN, open).unwrap();
    assert!(h.gate.is_allowed_transfer(TOKEN, MALLORY, ALICE, amount(1)));
}

#[test]
fn test_recover_tokens_held_by_gate() {
    let h = harness(standard_limits());
    h.gate.deposit_to_gate(OTHER_TOKEN, amount(40)).unwrap();

    assert_eq!(
        h.gate.recover_erc20(ADMIN, OTHER_TOKEN, GATE, amount(40)),
        Err(InvalidArgument::SelfRecovery.into())
    );
    assert!(matches!(
        h.gate.recover_erc20(ADMIN, OTHER_TOKEN, CAROL, amount(41)),
        Err(GateError::InsufficientBalance { .. })
    ));

    h.gate.recover_erc20(ADMIN, OTHER_TOKEN, CAROL, amount(40)).unwrap();
    assert_eq!(h.gate.balance_of(OTHER_TOKEN, CAROL), amount(40));
    assert_eq!(h.gate.balance_of(OTHER_TOKEN, GATE), U256::ZERO);
}
