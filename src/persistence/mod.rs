//! State persistence.
//!
//! # Data Flow
//! ```text
//! startup:  snapshot file exists? → load → restore components
//!           else                  → seed from config
//! shutdown / admin request:
//!           components → ServiceSnapshot → temp file → rename
//! ```
//!
//! # Design Decisions
//! - One JSON document for all components, so a restore is consistent
//! - Writes go to a sibling temp file first; a crash never leaves a
//!   truncated snapshot behind

pub mod store;

pub use store::{ServiceSnapshot, SnapshotStore, StoreError, SNAPSHOT_VERSION};
