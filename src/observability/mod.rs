//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! gate / limiter / whitelist
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (admission counters, state gauges)
//!
//! Consumers:
//!     → stdout (fmt layer, filter from RUST_LOG or config)
//!     → Prometheus scrape endpoint
//! ```
//!
//! # Design Decisions
//! - Recording a metric without an installed recorder is a no-op, so the
//!   library never requires the exporter
//! - Rejections are logged at `warn` with the typed reason

pub mod logging;
pub mod metrics;
