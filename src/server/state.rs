//! Application state shared across HTTP handlers

use crate::config::Config;
use crate::core::limiter::RateLimiter;
use crate::monitoring::Metrics;
use crate::utils::error::{ProxyError, Result};
use std::sync::Arc;

/// Shared resources for every request handler.
///
/// Everything here is immutable or internally synchronized; the proxy holds
/// no per-tenant or per-endpoint mutable state in process.
#[derive(Clone)]
pub struct AppState {
    /// Configuration snapshot (read-only for the process lifetime)
    pub config: Arc<Config>,
    /// Parsed origin base URL
    pub target_url: url::Url,
    /// Distributed rate limiter
    pub limiter: RateLimiter,
    /// Prometheus metric handles
    pub metrics: Arc<Metrics>,
    /// Upstream HTTP client (pooled, shared)
    pub http_client: reqwest::Client,
}

impl AppState {
    pub fn new(config: Config, limiter: RateLimiter, metrics: Arc<Metrics>) -> Result<Self> {
        let target_url = url::Url::parse(&config.proxy.target_url)
            .map_err(|e| ProxyError::config(format!("invalid target_url: {e}")))?;

        // A proxy relays redirects to the client instead of chasing them.
        let http_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(ProxyError::Upstream)?;

        Ok(Self {
            config: Arc::new(config),
            target_url,
            limiter,
            metrics,
            http_client,
        })
    }
}
