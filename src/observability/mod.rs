//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, Prometheus exposition)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Request IDs flow through tower-http layers, not hand-rolled spans
//! - Metric updates are cheap counters; the exporter is opt-in

pub mod logging;
pub mod metrics;
