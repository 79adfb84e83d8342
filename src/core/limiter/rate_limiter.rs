//! Rate limiter facade
//!
//! Three entry points, one per tier. Each builds the limit key, derives the
//! configuration fingerprint, and dispatches to the algorithm's script.
//! Disabled tiers pass unconditionally. Store errors are reported upward;
//! the admission pipeline decides fail-open, never this module.

use super::keys::{config_fingerprint, limit_key};
use super::scripts;
use super::types::LimitResult;
use crate::config::{AlgorithmParams, EndpointRule, GlobalLimit, LimitLevel, PerTenantLimit};
use crate::storage::RedisPool;
use crate::utils::error::Result;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Distributed rate limiter backed by the shared store.
#[derive(Clone)]
pub struct RateLimiter {
    pool: RedisPool,
}

/// Milliseconds since the Unix epoch, the time base of every script.
pub(crate) fn epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

impl RateLimiter {
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    pub(super) fn pool(&self) -> &RedisPool {
        &self.pool
    }

    /// Check the global tier.
    pub async fn check_global(&self, cfg: &GlobalLimit, deadline: Instant) -> Result<LimitResult> {
        if !cfg.enabled {
            return Ok(LimitResult::pass());
        }
        let Some(params) = &cfg.algorithm else {
            return Ok(LimitResult::pass());
        };

        let key = limit_key(LimitLevel::Global, "", &[], "");
        self.check_limit(&key, params, deadline).await
    }

    /// Check the per-tenant tier.
    pub async fn check_tenant(
        &self,
        tenant_key: &str,
        cfg: &PerTenantLimit,
        deadline: Instant,
    ) -> Result<LimitResult> {
        if !cfg.enabled {
            return Ok(LimitResult::pass());
        }
        let Some(params) = &cfg.algorithm else {
            return Ok(LimitResult::pass());
        };

        let key = limit_key(LimitLevel::PerTenant, "", &[], tenant_key);
        self.check_limit(&key, params, deadline).await
    }

    /// Check the per-endpoint tier for a matched rule.
    pub async fn check_endpoint(
        &self,
        tenant_key: &str,
        rule: &EndpointRule,
        deadline: Instant,
    ) -> Result<LimitResult> {
        // Bypass rules never reach this point; a rule without parameters
        // can only mean bypass, so pass rather than guess a limit.
        let Some(params) = &rule.algorithm else {
            return Ok(LimitResult::pass());
        };

        let key = limit_key(LimitLevel::PerEndpoint, &rule.path, &rule.methods, tenant_key);
        self.check_limit(&key, params, deadline).await
    }

    async fn check_limit(
        &self,
        key: &str,
        params: &AlgorithmParams,
        deadline: Instant,
    ) -> Result<LimitResult> {
        let fingerprint = config_fingerprint(params);
        let now = epoch_ms();

        let invocation = match params {
            AlgorithmParams::TokenBucket {
                capacity,
                refill_rate,
                refill_period,
            } => {
                let mut inv = scripts::TOKEN_BUCKET.key(key);
                inv.arg(fingerprint.as_str())
                    .arg(*capacity)
                    .arg(*refill_rate)
                    .arg(refill_period.as_millis())
                    .arg(now);
                inv
            }
            AlgorithmParams::LeakyBucket {
                capacity,
                leak_rate,
                leak_period,
            } => {
                let mut inv = scripts::LEAKY_BUCKET.key(key);
                inv.arg(fingerprint.as_str())
                    .arg(*capacity)
                    .arg(*leak_rate)
                    .arg(leak_period.as_millis())
                    .arg(now);
                inv
            }
            AlgorithmParams::FixedWindow { window_size, limit } => {
                let mut inv = scripts::FIXED_WINDOW.key(key);
                inv.arg(fingerprint.as_str())
                    .arg(*limit)
                    .arg(window_size.as_millis())
                    .arg(now);
                inv
            }
            AlgorithmParams::SlidingWindow { window_size, limit } => {
                let mut inv = scripts::SLIDING_WINDOW.key(key);
                inv.arg(fingerprint.as_str())
                    .arg(*limit)
                    .arg(window_size.as_millis())
                    .arg(now);
                inv
            }
        };

        let (allowed, remaining, retry_after_ms): (i64, i64, i64) =
            self.pool.invoke_script(invocation, deadline).await?;

        Ok(LimitResult {
            allowed: allowed == 1,
            remaining,
            retry_after: Duration::from_millis(retry_after_ms.max(0) as u64),
        })
    }
}
