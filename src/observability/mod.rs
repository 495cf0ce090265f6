//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! NodeClient, EventDispatcher, chain confirmation waits
//!     → logging.rs (tracing subscriber, EnvFilter)
//!     → metrics.rs (counters and histograms, Prometheus scrape endpoint)
//! ```
//!
//! Metric recording is a no-op until a recorder is installed, so the
//! library can be embedded without enabling the exporter.

pub mod logging;
pub mod metrics;

pub use logging::init_tracing;
pub use metrics::init_metrics;
