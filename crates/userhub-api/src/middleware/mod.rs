//! # Middleware Stack
//!
//! - `metrics`: request and error counters, also exported to Prometheus.
//! - `tracing_layer`: `TraceLayer` for per-request spans.

pub mod metrics;
pub mod tracing_layer;
