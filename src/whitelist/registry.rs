//! Membership registry with a global on/off switch.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use crate::access::{AccessControl, Role, RoleGrant};
use crate::error::GateResult;
use crate::events::{EventBus, GateEvent};
use crate::observability::metrics;

/// Persisted form of a [`WhitelistRegistry`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitelistSnapshot {
    pub enabled: bool,
    pub members: Vec<Address>,
    pub roles: Vec<RoleGrant>,
}

/// Boolean allow-list per principal.
#[derive(Debug)]
pub struct WhitelistRegistry {
    enabled: AtomicBool,
    members: RwLock<HashSet<Address>>,
    access: AccessControl,
    events: EventBus,
}

impl WhitelistRegistry {
    /// Create an enabled, empty registry administered by `admin`.
    pub fn new(admin: Address, events: EventBus) -> GateResult<Self> {
        Ok(Self {
            enabled: AtomicBool::new(true),
            members: RwLock::new(HashSet::new()),
            access: AccessControl::new(admin)?,
            events,
        })
    }

    /// Restore a registry from a snapshot.
    pub fn from_snapshot(snapshot: WhitelistSnapshot, events: EventBus) -> Self {
        let members: HashSet<Address> = snapshot.members.into_iter().collect();
        metrics::record_whitelist_size(members.len());
        Self {
            enabled: AtomicBool::new(snapshot.enabled),
            members: RwLock::new(members),
            access: AccessControl::from_grants(snapshot.roles),
            events,
        }
    }

    pub fn snapshot(&self) -> WhitelistSnapshot {
        let mut members: Vec<Address> = self
            .members
            .read()
            .expect("whitelist lock poisoned")
            .iter()
            .copied()
            .collect();
        members.sort();
        WhitelistSnapshot {
            enabled: self.is_enabled(),
            members,
            roles: self.access.grants(),
        }
    }

    pub fn access(&self) -> &AccessControl {
        &self.access
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// `true` when whitelisting is disabled or `account` is a member.
    pub fn is_whitelisted(&self, account: Address) -> bool {
        !self.is_enabled() || self.is_member(account)
    }

    /// Stored membership, ignoring the global switch.
    pub fn is_member(&self, account: Address) -> bool {
        self.members
            .read()
            .expect("whitelist lock poisoned")
            .contains(&account)
    }

    pub fn member_count(&self) -> usize {
        self.members.read().expect("whitelist lock poisoned").len()
    }

    /// Set membership for one account. Requires WHITELISTER.
    pub fn set_whitelisted(&self, caller: Address, account: Address, whitelisted: bool) -> GateResult<()> {
        self.batch_set_whitelisted(caller, &[account], whitelisted)
    }

    /// Set membership for every account in `accounts`. Requires WHITELISTER.
    ///
    /// Either every account is updated or, on error, none is.
    pub fn batch_set_whitelisted(
        &self,
        caller: Address,
        accounts: &[Address],
        whitelisted: bool,
    ) -> GateResult<()> {
        self.access.require(Role::Whitelister, caller)?;

        let size = {
            let mut members = self.members.write().expect("whitelist lock poisoned");
            for account in accounts {
                if whitelisted {
                    members.insert(*account);
                } else {
                    members.remove(account);
                }
            }
            members.len()
        };
        metrics::record_whitelist_size(size);

        for account in accounts {
            self.events.emit(GateEvent::WhitelistUpdated {
                account: *account,
                whitelisted,
            });
        }
        Ok(())
    }

    /// Turn whitelist enforcement on or off. Requires ADMIN.
    pub fn toggle_whitelisting(&self, caller: Address, enabled: bool) -> GateResult<()> {
        self.access.require(Role::Admin, caller)?;
        self.enabled.store(enabled, Ordering::SeqCst);
        self.events.emit(GateEvent::WhitelistingToggled { enabled });
        Ok(())
    }

    pub fn add_whitelister(&self, caller: Address, account: Address) -> GateResult<()> {
        self.grant(caller, Role::Whitelister, account)
    }

    pub fn remove_whitelister(&self, caller: Address, account: Address) -> GateResult<()> {
        self.revoke(caller, Role::Whitelister, account)
    }

    /// Mark a service identity as a trusted caller.
    pub fn authorize_contract(&self, caller: Address, account: Address) -> GateResult<()> {
        self.grant(caller, Role::Caller, account)
    }

    pub fn deauthorize_contract(&self, caller: Address, account: Address) -> GateResult<()> {
        self.revoke(caller, Role::Caller, account)
    }

    fn grant(&self, caller: Address, role: Role, account: Address) -> GateResult<()> {
        if self.access.grant(caller, role, account)? {
            self.events.emit(GateEvent::RoleGranted {
                role,
                account,
                sender: caller,
            });
        }
        Ok(())
    }

    fn revoke(&self, caller: Address, role: Role, account: Address) -> GateResult<()> {
        if self.access.revoke(caller, role, account)? {
            self.events.emit(GateEvent::RoleRevoked {
                role,
                account,
                sender: caller,
            });
        }
        Ok(())
    }
}
