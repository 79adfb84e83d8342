//! Tenant reputation
//!
//! Biases global admission under overload against repeat violators. Updates
//! are atomic scripts; reads are plain and fail open, so a broken store can
//! never turn reputation into a denial source on its own.

use super::keys::reputation_key;
use super::rate_limiter::{epoch_ms, RateLimiter};
use super::scripts;
use super::types::Reputation;
use crate::utils::error::Result;
use std::time::Instant;
use tracing::warn;

/// Tenants scoring at or below this are rejected when the global tier is
/// saturated; everyone above rides through on the reputation override.
pub const REPUTATION_THRESHOLD: f64 = 0.3;

impl RateLimiter {
    pub fn reputation_threshold(&self) -> f64 {
        REPUTATION_THRESHOLD
    }

    /// Record one allow/deny observation for a tenant and return the
    /// updated record.
    pub async fn update_reputation(
        &self,
        tenant_key: &str,
        is_violation: bool,
        deadline: Instant,
    ) -> Result<Reputation> {
        let key = reputation_key(tenant_key);

        let mut invocation = scripts::REPUTATION_UPDATE.key(key.as_str());
        invocation
            .arg(if is_violation { 1 } else { 0 })
            .arg(epoch_ms());

        let (score, violation_count, good_requests, ttl): (f64, i64, i64, i64) =
            self.pool().invoke_script(invocation, deadline).await?;

        Ok(Reputation {
            score,
            violation_count,
            good_requests,
            ttl,
        })
    }

    /// Read a tenant's reputation record.
    ///
    /// Read failures are swallowed: the caller sees a neutral record and
    /// the incident is only logged.
    pub async fn tenant_reputation(&self, tenant_key: &str, deadline: Instant) -> Reputation {
        let key = reputation_key(tenant_key);

        let mut cmd = redis::cmd("HMGET");
        cmd.arg(key.as_str())
            .arg("score")
            .arg("violation_count")
            .arg("good_requests");

        let fields: (Option<f64>, Option<i64>, Option<i64>) =
            match self.pool().query(cmd, deadline).await {
                Ok(fields) => fields,
                Err(e) => {
                    warn!(error = %e, tenant_key, "reputation read failed, assuming neutral");
                    return Reputation::neutral();
                }
            };

        let mut ttl_cmd = redis::cmd("TTL");
        ttl_cmd.arg(key.as_str());
        let ttl: i64 = self.pool().query(ttl_cmd, deadline).await.unwrap_or(0);

        Reputation {
            score: fields.0.unwrap_or(1.0),
            violation_count: fields.1.unwrap_or(0),
            good_requests: fields.2.unwrap_or(0),
            ttl: ttl.max(0),
        }
    }
}
