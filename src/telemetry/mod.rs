//! Telemetry: logging setup and counters
//!
//! - `tracing` subscriber initialization from config or RUST_LOG
//! - Middlebox frame counters and steering rule counters

mod logging;
mod metrics;

pub use logging::{init_logging, LogConfig, LogFormat};
pub use metrics::{Counter, MetricsRegistry};
