//! Metrics for streamwatch.
//!
//! Instrumented crates record through the `metrics` facade macros re-exported
//! here, using the names in [`definitions`]. Nothing is exported unless the
//! binary installs a recorder with [`init_metrics`]; with the `prometheus`
//! feature that recorder serves the Prometheus text format over HTTP.
//!
//! ```rust,ignore
//! use streamwatch_metrics::{counter, monitor};
//!
//! counter!(monitor::STATUS_CHANGES_TOTAL).increment(1);
//! ```

mod definitions;
mod recorder;

pub use {
    definitions::*,
    recorder::{MetricsRecorderConfig, init_metrics},
};

// Re-export metrics macros for convenience
pub use metrics::{counter, gauge, histogram};
