//! Shared test infrastructure

use std::time::{Duration, Instant};
use trafficctrl::config::{
    AlgorithmParams, Config, EndpointRule, GlobalLimit, HumanDuration, LimiterConfig,
    PerEndpointLimit, PerTenantLimit, RedisConfig, TenantStrategy,
};
use trafficctrl::core::limiter::RateLimiter;
use trafficctrl::storage::RedisPool;
use uuid::Uuid;

/// Redis target for e2e tests, overridable for CI.
pub fn redis_config() -> RedisConfig {
    RedisConfig {
        address: std::env::var("REDIS_ADDRESS").unwrap_or_else(|_| "127.0.0.1:6379".to_string()),
        password: String::new(),
        db: 0,
        pool_size: 10,
    }
}

pub async fn test_pool() -> RedisPool {
    RedisPool::connect(&redis_config())
        .await
        .expect("redis must be running for e2e tests (REDIS_ADDRESS)")
}

pub async fn test_limiter() -> RateLimiter {
    RateLimiter::new(test_pool().await)
}

/// A tenant key no other test (or earlier run) has touched.
pub fn unique_tenant(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

/// Store deadline generous enough for any test environment.
pub fn deadline() -> Instant {
    Instant::now() + Duration::from_secs(5)
}

pub fn token_bucket(capacity: u64, refill_rate: u64, refill_period_ms: u64) -> AlgorithmParams {
    AlgorithmParams::TokenBucket {
        capacity,
        refill_rate,
        refill_period: HumanDuration::from_millis(refill_period_ms),
    }
}

pub fn leaky_bucket(capacity: u64, leak_rate: u64, leak_period_ms: u64) -> AlgorithmParams {
    AlgorithmParams::LeakyBucket {
        capacity,
        leak_rate,
        leak_period: HumanDuration::from_millis(leak_period_ms),
    }
}

pub fn fixed_window(window_ms: u64, limit: u64) -> AlgorithmParams {
    AlgorithmParams::FixedWindow {
        window_size: HumanDuration::from_millis(window_ms),
        limit,
    }
}

pub fn sliding_window(window_ms: u64, limit: u64) -> AlgorithmParams {
    AlgorithmParams::SlidingWindow {
        window_size: HumanDuration::from_millis(window_ms),
        limit,
    }
}

pub fn tenant_limit(params: AlgorithmParams) -> PerTenantLimit {
    PerTenantLimit {
        enabled: true,
        algorithm: Some(params),
    }
}

/// Wait until the wall clock sits early inside a fixed window, so a test's
/// requests cannot straddle a window boundary.
pub async fn align_to_window(window_ms: u64) {
    loop {
        let now_ms = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_millis() as u64;
        if now_ms % window_ms < window_ms / 4 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// A config snapshot for pipeline tests: one catch-all rule keyed by a
/// per-test header so tests cannot interfere with each other.
pub fn pipeline_config(
    tenant_header: &str,
    global: Option<AlgorithmParams>,
    per_tenant: Option<AlgorithmParams>,
    endpoint: AlgorithmParams,
) -> Config {
    let mut config = Config {
        proxy: Default::default(),
        redis: redis_config(),
        logger: Default::default(),
        limiter: LimiterConfig {
            global: GlobalLimit {
                enabled: global.is_some(),
                algorithm: global,
            },
            per_tenant: PerTenantLimit {
                enabled: per_tenant.is_some(),
                algorithm: per_tenant,
            },
            per_endpoint: PerEndpointLimit {
                rules: vec![EndpointRule {
                    path: "*".to_string(),
                    methods: Vec::new(),
                    bypass: false,
                    tenant_strategy: Some(TenantStrategy::Header {
                        key: tenant_header.to_string(),
                    }),
                    algorithm: Some(endpoint),
                }],
            },
        },
    };
    config.proxy.dry_run_mode = false;
    config
}
