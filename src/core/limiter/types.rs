//! Limiter result types

use std::time::Duration;

/// Outcome of one limit check.
///
/// `remaining` is 0 on deny. `retry_after` is zero on allow; on deny it is
/// the minimum wall-clock delay before a retry can succeed under the
/// current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitResult {
    pub allowed: bool,
    pub remaining: i64,
    pub retry_after: Duration,
}

impl LimitResult {
    /// The result of a disabled tier: always allowed.
    pub fn pass() -> Self {
        Self {
            allowed: true,
            remaining: 0,
            retry_after: Duration::ZERO,
        }
    }
}

/// Reputation record for one tenant.
#[derive(Debug, Clone, PartialEq)]
pub struct Reputation {
    /// Score in [0.0, 1.0]; 1.0 is a spotless caller.
    pub score: f64,
    pub violation_count: i64,
    pub good_requests: i64,
    /// Record TTL in seconds as last written (or read); 0 when unknown.
    pub ttl: i64,
}

impl Reputation {
    /// The record assumed when none exists or the store cannot be read.
    pub fn neutral() -> Self {
        Self {
            score: 1.0,
            violation_count: 0,
            good_requests: 0,
            ttl: 0,
        }
    }
}
