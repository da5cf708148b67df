//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validate config → snapshot on disk? → restore
//!                                 else    → seed from config
//!     → GateService (gate + collaborators + snapshot store)
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → admin server drains → periodic snapshot task exits
//!             → final snapshot written
//! ```
//!
//! # Design Decisions
//! - A snapshot on disk always wins over config seeds
//! - Seeding goes through the same role-checked operations an operator
//!   would use, acting as the bootstrap admin
//! - Any startup error is fatal

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use signals::{spawn_signal_listener, wait_for_signal};
pub use startup::{spawn_periodic_snapshots, GateService, StartupError};
