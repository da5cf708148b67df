//! Token ledger admission layer.
//!
//! Every balance-changing operation on the ledger passes through a
//! [`LedgerGate`], which consults a [`WhitelistRegistry`] and a
//! [`RateLimiter`] before anything moves.

pub mod access;
pub mod admin;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod gate;
pub mod lifecycle;
pub mod limiter;
pub mod observability;
pub mod persistence;
pub mod whitelist;

pub use access::{AccessControl, Role};
pub use clock::{Clock, MockClock, SystemClock};
pub use config::GateConfig;
pub use error::{GateError, GateResult, InvalidArgument};
pub use events::{EventBus, GateEvent};
pub use gate::LedgerGate;
pub use lifecycle::{GateService, Shutdown};
pub use limiter::{LimitConfig, RateLimiter};
pub use whitelist::WhitelistRegistry;
