//! Whitelist subsystem.
//!
//! # Data Flow
//! ```text
//! WHITELISTER → set_whitelisted / batch_set_whitelisted → members
//! ADMIN       → toggle_whitelisting                      → enabled
//! anyone      → is_whitelisted(addr) = !enabled || members[addr]
//! ```
//!
//! # Design Decisions
//! - Membership edits and the global switch are independent: disabling
//!   keeps the member set intact, re-enabling restores every answer
//! - Batches are applied under one write lock, so readers never see a
//!   half-applied batch

pub mod registry;

pub use registry::{WhitelistRegistry, WhitelistSnapshot};
