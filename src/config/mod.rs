//! Configuration management
//!
//! Four YAML files under `CONFIG_DIR` (`proxy.yaml`, `redis.yaml`,
//! `logger.yaml`, `limiter.yaml`), each with built-in defaults and
//! environment-variable overrides. The loaded snapshot is immutable for the
//! process lifetime.

mod loader;
mod models;
mod validation;

pub use loader::load;
pub use models::{
    AlgorithmParams, Config, EndpointRule, GlobalLimit, HumanDuration, LimitLevel, LimiterConfig,
    LoggerConfig, PerEndpointLimit, PerTenantLimit, ProxyConfig, RedisConfig, TenantStrategy,
};
pub use validation::Validate;
