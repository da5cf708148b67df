//! Role grant table keyed by (role, principal).

use alloy::primitives::Address;
use dashmap::DashSet;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{GateError, GateResult, InvalidArgument};

/// Capabilities checked at component entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Manages roles and global switches.
    Admin,
    /// Edits whitelist membership.
    Whitelister,
    /// Sets per-principal limit overrides.
    LimitManager,
    /// Trusted service identity allowed to consume quota.
    Caller,
    /// May mint through the gate.
    Minter,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Admin => "ADMIN",
            Role::Whitelister => "WHITELISTER",
            Role::LimitManager => "LIMIT_MANAGER",
            Role::Caller => "CALLER",
            Role::Minter => "MINTER",
        };
        f.write_str(name)
    }
}

/// A single persisted grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleGrant {
    pub role: Role,
    pub account: Address,
}

/// Concurrent set of role grants.
#[derive(Debug, Default)]
pub struct AccessControl {
    grants: DashSet<(Role, Address)>,
}

impl AccessControl {
    /// Create a table with `admin` holding [`Role::Admin`].
    pub fn new(admin: Address) -> GateResult<Self> {
        if admin == Address::ZERO {
            return Err(InvalidArgument::ZeroAddress.into());
        }
        let control = Self::default();
        control.grants.insert((Role::Admin, admin));
        Ok(control)
    }

    /// Rebuild a table from persisted grants.
    pub fn from_grants(grants: impl IntoIterator<Item = RoleGrant>) -> Self {
        let control = Self::default();
        for grant in grants {
            control.grants.insert((grant.role, grant.account));
        }
        control
    }

    pub fn has_role(&self, role: Role, account: Address) -> bool {
        self.grants.contains(&(role, account))
    }

    /// Fail with [`GateError::Unauthorized`] unless `caller` holds `role`.
    pub fn require(&self, role: Role, caller: Address) -> GateResult<()> {
        if self.has_role(role, caller) {
            Ok(())
        } else {
            Err(GateError::Unauthorized { role, caller })
        }
    }

    /// Grant `role` to `account`. Requires ADMIN.
    ///
    /// Returns `true` if the grant is new.
    pub fn grant(&self, caller: Address, role: Role, account: Address) -> GateResult<bool> {
        self.require(Role::Admin, caller)?;
        if account == Address::ZERO {
            return Err(InvalidArgument::ZeroAddress.into());
        }
        Ok(self.grants.insert((role, account)))
    }

    /// Revoke `role` from `account`. Requires ADMIN.
    ///
    /// Returns `true` if a grant was removed.
    pub fn revoke(&self, caller: Address, role: Role, account: Address) -> GateResult<bool> {
        self.require(Role::Admin, caller)?;
        if account == Address::ZERO {
            return Err(InvalidArgument::ZeroAddress.into());
        }
        Ok(self.grants.remove(&(role, account)).is_some())
    }

    /// All grants, ordered for stable snapshots.
    pub fn grants(&self) -> Vec<RoleGrant> {
        let mut grants: Vec<RoleGrant> = self
            .grants
            .iter()
            .map(|entry| {
                let (role, account) = *entry.key();
                RoleGrant { role, account }
            })
            .collect();
        grants.sort_by_key(|g| (g.role as u8, g.account));
        grants
    }
}
