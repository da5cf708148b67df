//! In-memory balance book per (asset, account).

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{GateError, GateResult};

/// Persisted balance of one account in one asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceRecord {
    pub asset: Address,
    pub account: Address,
    pub amount: U256,
}

/// Balances and supply. Not synchronized; the gate owns the lock.
#[derive(Debug, Default)]
pub struct Ledger {
    balances: HashMap<(Address, Address), U256>,
    supply: HashMap<Address, U256>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild balances and recompute supply.
    pub fn from_records(records: impl IntoIterator<Item = BalanceRecord>) -> GateResult<Self> {
        let mut ledger = Self::new();
        for record in records {
            ledger.credit(record.asset, record.account, record.amount)?;
        }
        Ok(ledger)
    }

    pub fn records(&self) -> Vec<BalanceRecord> {
        let mut records: Vec<BalanceRecord> = self
            .balances
            .iter()
            .filter(|(_, amount)| !amount.is_zero())
            .map(|(&(asset, account), &amount)| BalanceRecord { asset, account, amount })
            .collect();
        records.sort_by_key(|r| (r.asset, r.account));
        records
    }

    pub fn balance_of(&self, asset: Address, account: Address) -> U256 {
        self.balances.get(&(asset, account)).copied().unwrap_or_default()
    }

    pub fn total_supply(&self, asset: Address) -> U256 {
        self.supply.get(&asset).copied().unwrap_or_default()
    }

    /// Fail unless `account` holds at least `amount`.
    pub fn ensure_balance(&self, asset: Address, account: Address, amount: U256) -> GateResult<()> {
        let balance = self.balance_of(asset, account);
        if balance < amount {
            return Err(GateError::InsufficientBalance {
                account,
                balance,
                required: amount,
            });
        }
        Ok(())
    }

    /// Fail unless `amount` can be created for `account` without overflowing
    /// its balance or the asset's supply.
    pub fn ensure_credit(&self, asset: Address, account: Address, amount: U256) -> GateResult<()> {
        let overflow = GateError::SupplyOverflow { asset, amount };
        self.total_supply(asset).checked_add(amount).ok_or(overflow.clone())?;
        self.balance_of(asset, account).checked_add(amount).ok_or(overflow)?;
        Ok(())
    }

    /// Move `amount` between accounts, failing without mutation on shortfall
    /// or overflow.
    pub fn move_balance(&mut self, asset: Address, from: Address, to: Address, amount: U256) -> GateResult<()> {
        self.ensure_balance(asset, from, amount)?;
        if from == to {
            return Ok(());
        }
        let to_balance = self
            .balance_of(asset, to)
            .checked_add(amount)
            .ok_or(GateError::SupplyOverflow { asset, amount })?;
        *self.balances.entry((asset, from)).or_default() -= amount;
        self.balances.insert((asset, to), to_balance);
        Ok(())
    }

    /// Create `amount` for `account`. Nothing changes if either the balance
    /// or the supply would overflow.
    pub fn credit(&mut self, asset: Address, account: Address, amount: U256) -> GateResult<()> {
        self.ensure_credit(asset, account, amount)?;
        *self.balances.entry((asset, account)).or_default() += amount;
        *self.supply.entry(asset).or_default() += amount;
        Ok(())
    }

    /// Destroy `amount` held by `account`.
    pub fn debit(&mut self, asset: Address, account: Address, amount: U256) -> GateResult<()> {
        self.ensure_balance(asset, account, amount)?;
        let balance = self.balances.entry((asset, account)).or_default();
        *balance -= amount;
        let supply = self.supply.entry(asset).or_default();
        *supply = supply.saturating_sub(amount);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ASSET: Address = Address::repeat_byte(0x70);
    const ALICE: Address = Address::repeat_byte(0xa1);
    const BOB: Address = Address::repeat_byte(0xb0);

    #[test]
    fn test_credit_move_debit() {
        let mut ledger = Ledger::new();
        ledger.credit(ASSET, ALICE, U256::from(100)).unwrap();
        ledger.move_balance(ASSET, ALICE, BOB, U256::from(30)).unwrap();

        assert_eq!(ledger.balance_of(ASSET, ALICE), U256::from(70));
        assert_eq!(ledger.balance_of(ASSET, BOB), U256::from(30));

        ledger.debit(ASSET, BOB, U256::from(30)).unwrap();
        assert_eq!(ledger.total_supply(ASSET), U256::from(70));
    }

    #[test]
    fn test_insufficient_balance_leaves_state() {
        let mut ledger = Ledger::new();
        ledger.credit(ASSET, ALICE, U256::from(10)).unwrap();

        let err = ledger.move_balance(ASSET, ALICE, BOB, U256::from(11)).unwrap_err();
        assert!(matches!(err, GateError::InsufficientBalance { .. }));
        assert_eq!(ledger.balance_of(ASSET, ALICE), U256::from(10));
        assert_eq!(ledger.balance_of(ASSET, BOB), U256::ZERO);
    }

    #[test]
    fn test_records_recompute_supply() {
        let mut ledger = Ledger::new();
        ledger.credit(ASSET, ALICE, U256::from(5)).unwrap();
        ledger.credit(ASSET, BOB, U256::from(7)).unwrap();

        let restored = Ledger::from_records(ledger.records()).unwrap();
        assert_eq!(restored.total_supply(ASSET), U256::from(12));
        assert_eq!(restored.balance_of(ASSET, BOB), U256::from(7));
    }

    #[test]
    fn test_overflowing_credit_changes_nothing() {
        let mut ledger = Ledger::new();
        ledger.credit(ASSET, ALICE, U256::MAX).unwrap();

        let err = ledger.credit(ASSET, BOB, U256::from(5)).unwrap_err();
        assert_eq!(err, GateError::SupplyOverflow { asset: ASSET, amount: U256::from(5) });
        assert_eq!(ledger.total_supply(ASSET), U256::MAX);
        assert_eq!(ledger.balance_of(ASSET, BOB), U256::ZERO);
    }

    #[test]
    fn test_move_to_self_keeps_balance() {
        let mut ledger = Ledger::new();
        ledger.credit(ASSET, ALICE, U256::from(10)).unwrap();
        ledger.move_balance(ASSET, ALICE, ALICE, U256::from(10)).unwrap();
        assert_eq!(ledger.balance_of(ASSET, ALICE), U256::from(10));
    }

    #[test]
    fn test_overflowing_records_rejected() {
        let records = [
            BalanceRecord { asset: ASSET, account: ALICE, amount: U256::MAX },
            BalanceRecord { asset: ASSET, account: BOB, amount: U256::from(1) },
        ];
        assert!(matches!(
            Ledger::from_records(records),
            Err(GateError::SupplyOverflow { .. })
        ));
    }
}
