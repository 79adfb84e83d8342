//! HTTP middleware implementations

mod metrics;

pub use metrics::{RequestMetricsMiddleware, RequestMetricsService};
