//! Ledger gate subsystem.
//!
//! # Data Flow
//! ```text
//! transfer(asset, from, to, amount)
//!     → settings snapshot (paused, *_checks_enabled)
//!     → paused?                     → Paused
//!     → whitelist(from, to)         → NotWhitelisted
//!     → balance(from) >= amount     → InsufficientBalance
//!     → limiter.admit(from, amount) → LimitExceeded / CooldownNotElapsed / ExceedsPeriodLimit
//!     → ledger.move_balance
//!     → Transfer event
//! ```
//!
//! # Design Decisions
//! - The ledger mutex is held across check and apply, so the balance a
//!   decision was made on is the balance that gets debited
//! - Limiter work runs inside that section but does no I/O
//! - Settings and collaborators are read through `ArcSwap`, never torn

pub mod ledger;
pub mod ledger_gate;

pub use ledger::{BalanceRecord, Ledger};
pub use ledger_gate::{GateSettings, GateSnapshot, LedgerGate, Operation};
