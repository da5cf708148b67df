//! Time source for cooldowns and accounting windows.
//!
//! All temporal decisions read unix seconds through [`Clock`], so tests can
//! drive cooldown and period rotation with [`MockClock`] instead of sleeping.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Port for obtaining the current unix time in seconds.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> u64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

/// Manually advanced clock.
///
/// Clones share the same underlying time, so advancing one clone is observed
/// by every component holding another.
#[derive(Debug, Clone)]
pub struct MockClock {
    current: Arc<AtomicU64>,
}

impl MockClock {
    /// Create a mock clock starting at `start` seconds.
    pub fn new(start: u64) -> Self {
        Self {
            current: Arc::new(AtomicU64::new(start)),
        }
    }

    /// Advance the clock by `secs`.
    pub fn advance(&self, secs: u64) {
        self.current.fetch_add(secs, Ordering::SeqCst);
    }

    /// Set the clock to an absolute time.
    pub fn set(&self, now: u64) {
        self.current.store(now, Ordering::SeqCst);
    }
}

impl Clock for MockClock {
    fn now(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }
}
