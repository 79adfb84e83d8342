//! Prometheus metrics
//!
//! All counters and histograms live in one struct registered against a
//! private registry, shared via `Arc` in the application state. The
//! `/metrics` listener renders the registry in the Prometheus text format.

use crate::config::LimitLevel;
use crate::utils::error::{ProxyError, Result};
use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};

/// Metric handles for the whole process.
pub struct Metrics {
    registry: Registry,

    /// Requests that matched a non-bypass rule, by method and rule path
    pub total_requests: IntCounterVec,
    /// Requests with no matching rule, an explicit bypass, or a fail-open
    pub bypassed_requests: IntCounter,
    /// Requests currently in flight
    pub requests_in_flight: IntGauge,
    /// Latency of classified requests
    pub request_duration: HistogramVec,
    /// Requests that cleared every enabled tier
    pub allowed_requests: IntCounter,
    /// Denials by tier
    pub denied_requests: IntCounterVec,
    /// Reputation scores observed on global-tier overload
    pub reputation_distribution: Histogram,
    /// Store failures of any kind
    pub redis_errors: IntCounter,
    pub global_limit_errors: IntCounter,
    pub tenant_limit_errors: IntCounter,
    pub endpoint_limit_errors: IntCounter,
    /// Panics caught by the admission barrier
    pub panic_recoveries: IntCounter,
}

fn register<M: prometheus::core::Collector + Clone + 'static>(
    registry: &Registry,
    metric: M,
) -> Result<M> {
    registry
        .register(Box::new(metric.clone()))
        .map_err(|e| ProxyError::Server(format!("metrics registration failed: {e}")))?;
    Ok(metric)
}

fn counter(registry: &Registry, name: &str, help: &str) -> Result<IntCounter> {
    let metric = IntCounter::new(name, help)
        .map_err(|e| ProxyError::Server(format!("metrics registration failed: {e}")))?;
    register(registry, metric)
}

impl Metrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let total_requests = register(
            &registry,
            IntCounterVec::new(
                Opts::new("requests_total", "Total number of requests received"),
                &["method", "endpoint"],
            )
            .map_err(|e| ProxyError::Server(format!("metrics registration failed: {e}")))?,
        )?;

        let bypassed_requests = counter(
            &registry,
            "requests_bypassed",
            "Requests forwarded without rate limiting (no rule or bypass)",
        )?;

        let requests_in_flight = register(
            &registry,
            IntGauge::new("requests_in_flight", "Requests currently being processed")
                .map_err(|e| ProxyError::Server(format!("metrics registration failed: {e}")))?,
        )?;

        let request_duration = register(
            &registry,
            HistogramVec::new(
                HistogramOpts::new("request_duration_seconds", "Request latency histogram"),
                &["method", "endpoint"],
            )
            .map_err(|e| ProxyError::Server(format!("metrics registration failed: {e}")))?,
        )?;

        let allowed_requests = counter(
            &registry,
            "rate_limit_requests_allowed_total",
            "Requests allowed by the rate limiter",
        )?;

        let denied_requests = register(
            &registry,
            IntCounterVec::new(
                Opts::new(
                    "rate_limit_requests_denied_total",
                    "Requests denied by the rate limiter",
                ),
                &["level"],
            )
            .map_err(|e| ProxyError::Server(format!("metrics registration failed: {e}")))?,
        )?;

        let reputation_distribution = register(
            &registry,
            Histogram::with_opts(
                HistogramOpts::new(
                    "reputation_score_distribution",
                    "Distribution of reputation scores for requests",
                )
                .buckets(vec![0.0, 0.25, 0.5, 0.75, 1.0]),
            )
            .map_err(|e| ProxyError::Server(format!("metrics registration failed: {e}")))?,
        )?;

        let redis_errors = counter(&registry, "redis_errors_total", "Total store errors")?;
        let global_limit_errors = counter(
            &registry,
            "global_limit_errors_total",
            "Errors in the global limiter",
        )?;
        let tenant_limit_errors = counter(
            &registry,
            "tenant_limit_errors_total",
            "Errors in the tenant limiter",
        )?;
        let endpoint_limit_errors = counter(
            &registry,
            "endpoint_limit_errors_total",
            "Errors in the endpoint limiter",
        )?;
        let panic_recoveries = counter(
            &registry,
            "panic_recoveries_total",
            "Panics recovered by the admission barrier",
        )?;

        Ok(Self {
            registry,
            total_requests,
            bypassed_requests,
            requests_in_flight,
            request_duration,
            allowed_requests,
            denied_requests,
            reputation_distribution,
            redis_errors,
            global_limit_errors,
            tenant_limit_errors,
            endpoint_limit_errors,
            panic_recoveries,
        })
    }

    /// Record a denial at the given tier.
    pub fn record_denial(&self, level: LimitLevel) {
        self.denied_requests
            .with_label_values(&[level.as_str()])
            .inc();
    }

    /// Record a failed tier check. The store counter only moves for
    /// genuine store faults, not for other internal errors.
    pub fn record_tier_error(&self, level: LimitLevel, store_error: bool) {
        if store_error {
            self.redis_errors.inc();
        }
        match level {
            LimitLevel::Global => self.global_limit_errors.inc(),
            LimitLevel::PerTenant => self.tenant_limit_errors.inc(),
            LimitLevel::PerEndpoint => self.endpoint_limit_errors.inc(),
        }
    }

    /// Render the registry in the Prometheus text exposition format.
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| ProxyError::Server(format!("metrics encoding failed: {e}")))?;
        String::from_utf8(buffer)
            .map_err(|e| ProxyError::Server(format!("metrics encoding failed: {e}")))
    }
}
