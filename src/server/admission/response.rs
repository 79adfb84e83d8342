//! Denial response shaping
//!
//! The two documented 429 shapes: a tier denial and a reputation denial.
//! Everything else a client sees comes from the origin.

use crate::config::LimitLevel;
use crate::core::limiter::{LimitResult, Reputation};
use actix_web::HttpResponse;
use serde_json::json;
use tracing::warn;

/// A decision to reject, carrying what the response body needs.
#[derive(Debug, Clone)]
pub enum Denial {
    /// A tier denied the request.
    Limit {
        level: LimitLevel,
        result: LimitResult,
    },
    /// The global tier is saturated and the tenant's reputation is too low
    /// for the override.
    Reputation {
        reputation: Reputation,
        result: LimitResult,
    },
}

impl Denial {
    /// Shape the 429 response.
    pub fn into_response(self) -> HttpResponse {
        match self {
            Denial::Limit { level, result } => {
                warn!(
                    limit_level = %level,
                    retry_after = result.retry_after.as_secs_f64(),
                    "rate limit exceeded, request denied"
                );

                let mut builder = HttpResponse::TooManyRequests();
                builder.insert_header(("Content-Type", "application/json"));
                builder.insert_header(("X-RateLimit-Remaining", "0"));

                let retry_secs = result.retry_after.as_secs();
                if retry_secs > 0 {
                    builder.insert_header(("Retry-After", retry_secs.to_string()));
                }

                builder.json(json!({
                    "error": "rate limit exceeded",
                    "limit_level": level,
                    "remaining": result.remaining,
                    "retry_after": result.retry_after.as_secs_f64(),
                }))
            }
            Denial::Reputation { reputation, result } => {
                warn!(
                    reputation_score = reputation.score,
                    violations_count = reputation.violation_count,
                    reputation_ttl = reputation.ttl,
                    "server on high load, tenants with bad reputation are banned"
                );

                let mut builder = HttpResponse::TooManyRequests();
                builder.insert_header(("Content-Type", "application/json"));
                builder.insert_header(("X-RateLimit-Remaining", "0"));

                builder.json(json!({
                    "error": "server on high load, tenants with bad reputation are banned",
                    "reputation_score": reputation.score,
                    "violations_count": reputation.violation_count,
                    "retry_after": result.retry_after.as_secs_f64(),
                }))
            }
        }
    }
}
