//! Events emitted by state-changing operations.

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::access::Role;
use crate::limiter::LimitConfig;
use crate::observability::metrics;

const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Which backing collaborator of the gate was replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collaborator {
    WhitelistManager,
    TransferLimiter,
}

/// A state change observed by the gate or one of its collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GateEvent {
    WhitelistUpdated {
        account: Address,
        whitelisted: bool,
    },
    WhitelistingToggled {
        enabled: bool,
    },
    RoleGranted {
        role: Role,
        account: Address,
        sender: Address,
    },
    RoleRevoked {
        role: Role,
        account: Address,
        sender: Address,
    },
    DefaultLimitsUpdated {
        asset: Address,
        limits: LimitConfig,
    },
    UserLimitsUpdated {
        asset: Address,
        account: Address,
        limits: LimitConfig,
    },
    UserLimitsReset {
        asset: Address,
        account: Address,
    },
    UserPeriodReset {
        asset: Address,
        account: Address,
    },
    ExemptionUpdated {
        asset: Address,
        account: Address,
        exempt: bool,
    },
    TransferRecorded {
        asset: Address,
        account: Address,
        amount: U256,
        period_total: U256,
    },
    ConfigUpdated {
        limit_checks_enabled: bool,
        whitelist_checks_enabled: bool,
    },
    Paused {
        account: Address,
    },
    Unpaused {
        account: Address,
    },
    CollaboratorReplaced {
        collaborator: Collaborator,
    },
    TokensRecovered {
        asset: Address,
        to: Address,
        amount: U256,
    },
    Transfer {
        asset: Address,
        from: Address,
        to: Address,
        amount: U256,
    },
}

impl GateEvent {
    /// Event name used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            GateEvent::WhitelistUpdated { .. } => "whitelist_updated",
            GateEvent::WhitelistingToggled { .. } => "whitelisting_toggled",
            GateEvent::RoleGranted { .. } => "role_granted",
            GateEvent::RoleRevoked { .. } => "role_revoked",
            GateEvent::DefaultLimitsUpdated { .. } => "default_limits_updated",
            GateEvent::UserLimitsUpdated { .. } => "user_limits_updated",
            GateEvent::UserLimitsReset { .. } => "user_limits_reset",
            GateEvent::UserPeriodReset { .. } => "user_period_reset",
            GateEvent::ExemptionUpdated { .. } => "exemption_updated",
            GateEvent::TransferRecorded { .. } => "transfer_recorded",
            GateEvent::ConfigUpdated { .. } => "config_updated",
            GateEvent::Paused { .. } => "paused",
            GateEvent::Unpaused { .. } => "unpaused",
            GateEvent::CollaboratorReplaced { .. } => "collaborator_replaced",
            GateEvent::TokensRecovered { .. } => "tokens_recovered",
            GateEvent::Transfer { .. } => "transfer",
        }
    }
}

/// Fan-out for [`GateEvent`]s.
///
/// Cloning is cheap and every clone publishes into the same channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<GateEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Subscribe to all events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<GateEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. Never fails when there are no subscribers.
    pub fn emit(&self, event: GateEvent) {
        tracing::info!(kind = event.kind(), event = ?event, "gate event");
        metrics::record_event(event.kind());
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
