//! Capability-based authorization.
//!
//! # Data Flow
//! ```text
//! entry point (caller, args)
//!     → AccessControl::require(role, caller)
//!     → lookup (role, caller) in the grant table
//!     → Unauthorized, or proceed to the operation
//! ```
//!
//! # Design Decisions
//! - One table per component; grants never cascade between components
//! - No role inheritance: ADMIN does not implicitly hold WHITELISTER
//! - The null principal can never receive a grant

pub mod control;

pub use control::{AccessControl, Role, RoleGrant};
