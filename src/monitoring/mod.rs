//! Metrics collection and exposition

mod metrics;

pub use metrics::Metrics;
