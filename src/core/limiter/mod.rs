//! Distributed rate limiting
//!
//! Four admission algorithms (token bucket, leaky bucket, fixed window,
//! sliding window) implemented as atomic Lua scripts against the shared
//! store, plus the per-tenant reputation engine. The facade in
//! [`RateLimiter`] owns key construction, fingerprinting, and dispatch.

mod keys;
mod rate_limiter;
mod reputation;
mod scripts;
mod types;

pub use keys::{config_fingerprint, limit_key, reputation_key};
pub use rate_limiter::RateLimiter;
pub use reputation::REPUTATION_THRESHOLD;
pub use types::{LimitResult, Reputation};
