//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! HTTP layer and mint pipeline produce:
//!     → logging.rs (structured log events, filtered by RUST_LOG or config)
//!     → metrics.rs (counters and histograms, Prometheus scrape)
//!     → tracing.rs (per-request spans carrying the request ID)
//! ```

pub mod logging;
pub mod metrics;
pub mod tracing;
