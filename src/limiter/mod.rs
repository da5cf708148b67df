//! Transfer rate limiting.
//!
//! # Data Flow
//! ```text
//! ADMIN         → asset defaults, exemptions, trusted callers
//! LIMIT_MANAGER → per-principal overrides, period resets
//! CALLER        → enforce_cooldown / record_transfer / admit
//!                     → resolve effective limits (override > default)
//!                     → lazy window rotation at `now`
//!                     → commit under the (asset, principal) entry guard
//! anyone        → read helpers (no mutation, no rotation persisted)
//! ```
//!
//! # Design Decisions
//! - State is created lazily on first interaction and never deleted
//! - Rotation is a pure function of the clock, recomputed on access
//! - Exempt principals pass every check and leave no counters behind
//! - Failed checks commit nothing, so retries are always safe

pub mod rate_limiter;
pub mod types;

pub use rate_limiter::{AssetLimits, LimiterSnapshot, PrincipalRecord, RateLimiter};
pub use types::{LimitConfig, PrincipalState, PrincipalView, DEFAULT_PERIOD_DURATION_SECS};
