//! Configuration validation
//!
//! Runs after file load and environment overrides. Any failure here is a
//! startup error; nothing in this module is reachable at request time.

use super::models::*;
use crate::utils::error::{ProxyError, Result};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "fatal"];

/// Startup validation for a config section.
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

impl Validate for LoggerConfig {
    fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.level.as_str()) {
            return Err(ProxyError::config(format!(
                "invalid logger config (level): {:?}, must be one of {LOG_LEVELS:?}",
                self.level
            )));
        }

        if self.environment != "development" && self.environment != "production" {
            return Err(ProxyError::config(format!(
                "invalid logger config (environment): {:?}, must be development or production",
                self.environment
            )));
        }

        Ok(())
    }
}

impl Validate for ProxyConfig {
    fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.target_url).map_err(|e| {
            ProxyError::config(format!("invalid proxy config (target_url): {e}"))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ProxyError::config(format!(
                "invalid proxy config (target_url): scheme must be http or https, got {:?}",
                url.scheme()
            )));
        }

        validate_port("proxy_port", self.proxy_port)?;
        validate_port("metrics_port", self.metrics_port)?;
        if self.proxy_port == self.metrics_port {
            return Err(ProxyError::config(
                "invalid proxy config: proxy_port and metrics_port must differ",
            ));
        }

        if self.server_name.trim().is_empty() {
            return Err(ProxyError::config(
                "invalid proxy config (server_name): cannot be empty",
            ));
        }

        Ok(())
    }
}

fn validate_port(field: &str, port: u16) -> Result<()> {
    if port < 1024 {
        return Err(ProxyError::config(format!(
            "invalid proxy config ({field}): {port} is outside 1024..=65535"
        )));
    }
    Ok(())
}

impl Validate for RedisConfig {
    fn validate(&self) -> Result<()> {
        if self.address.trim().is_empty() {
            return Err(ProxyError::config(
                "invalid redis config (address): cannot be empty",
            ));
        }
        if self.pool_size == 0 {
            return Err(ProxyError::config(
                "invalid redis config (pool_size): must be greater than zero",
            ));
        }
        Ok(())
    }
}

impl Validate for LimiterConfig {
    fn validate(&self) -> Result<()> {
        if self.global.enabled {
            let params = self.global.algorithm.as_ref().ok_or_else(|| {
                ProxyError::config("invalid limiter config (global): enabled but no algorithm")
            })?;
            validate_params("global", params)?;
        }

        if self.per_tenant.enabled {
            let params = self.per_tenant.algorithm.as_ref().ok_or_else(|| {
                ProxyError::config("invalid limiter config (per_tenant): enabled but no algorithm")
            })?;
            validate_params("per_tenant", params)?;
        }

        for (idx, rule) in self.per_endpoint.rules.iter().enumerate() {
            if rule.path.trim().is_empty() {
                return Err(ProxyError::config(format!(
                    "invalid limiter config (rule #{idx}): path cannot be empty"
                )));
            }
            if rule.bypass {
                continue;
            }
            let params = rule.algorithm.as_ref().ok_or_else(|| {
                ProxyError::config(format!(
                    "invalid limiter config (rule #{idx}, path {:?}): no algorithm and not a bypass rule",
                    rule.path
                ))
            })?;
            validate_params(&format!("rule #{idx}"), params)?;
        }

        Ok(())
    }
}

fn validate_params(context: &str, params: &AlgorithmParams) -> Result<()> {
    let fail = |field: &str| {
        Err(ProxyError::config(format!(
            "invalid limiter config ({context}, {}): {field} must be greater than zero",
            params.tag()
        )))
    };

    match params {
        AlgorithmParams::TokenBucket {
            capacity,
            refill_rate,
            refill_period,
        } => {
            if *capacity == 0 {
                return fail("capacity");
            }
            if *refill_rate == 0 {
                return fail("refill_rate");
            }
            if refill_period.as_millis() == 0 {
                return fail("refill_period");
            }
        }
        AlgorithmParams::LeakyBucket {
            capacity,
            leak_rate,
            leak_period,
        } => {
            if *capacity == 0 {
                return fail("capacity");
            }
            if *leak_rate == 0 {
                return fail("leak_rate");
            }
            if leak_period.as_millis() == 0 {
                return fail("leak_period");
            }
        }
        AlgorithmParams::FixedWindow { window_size, limit }
        | AlgorithmParams::SlidingWindow { window_size, limit } => {
            if window_size.as_millis() == 0 {
                return fail("window_size");
            }
            if *limit == 0 {
                return fail("limit");
            }
        }
    }

    Ok(())
}
