//! Configuration loading
//!
//! Each config file is loaded independently from `CONFIG_DIR` (default
//! `./config`), falling back to built-in defaults when the file is absent.
//! Environment variables override file values; validation runs last and is
//! fatal on failure.

use super::models::*;
use super::validation::Validate;
use crate::utils::error::{ProxyError, Result};
use serde::de::DeserializeOwned;
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

fn config_path(file: &str) -> PathBuf {
    let dir = env::var("CONFIG_DIR").unwrap_or_else(|_| "./config".to_string());
    Path::new(&dir).join(file)
}

fn load_file<T: DeserializeOwned + Default>(file: &str) -> Result<T> {
    let path = config_path(file);
    if !path.exists() {
        debug!("config file {} not found, using defaults", path.display());
        return Ok(T::default());
    }

    let raw = std::fs::read_to_string(&path)
        .map_err(|e| ProxyError::config(format!("couldn't read {}: {e}", path.display())))?;
    serde_yaml::from_str(&raw)
        .map_err(|e| ProxyError::config(format!("couldn't decode {}: {e}", path.display())))
}

fn env_string(var: &str) -> Option<String> {
    env::var(var).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(var: &str) -> Result<Option<T>> {
    match env_string(var) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| ProxyError::config(format!("invalid value {raw:?} for {var}"))),
        None => Ok(None),
    }
}

/// Load, override, and validate the full configuration snapshot.
pub fn load() -> Result<Config> {
    let logger = load_logger_config()?;
    let redis = load_redis_config()?;
    let proxy = load_proxy_config()?;
    let limiter = load_limiter_config()?;

    Ok(Config {
        proxy,
        redis,
        logger,
        limiter,
    })
}

fn load_logger_config() -> Result<LoggerConfig> {
    let mut cfg: LoggerConfig = load_file("logger.yaml")?;

    if let Some(level) = env_string("LOG_LEVEL") {
        cfg.level = level;
    }
    if let Some(environment) = env_string("LOG_ENVIRONMENT") {
        cfg.environment = environment;
    }
    if let Some(path) = env_string("LOG_OUTPUT_PATH") {
        cfg.output_path = path;
    }

    cfg.validate()?;
    Ok(cfg)
}

fn load_redis_config() -> Result<RedisConfig> {
    let mut cfg: RedisConfig = load_file("redis.yaml")?;

    if let Some(address) = env_string("REDIS_ADDRESS") {
        cfg.address = address;
    }
    if let Some(password) = env_string("REDIS_PASSWORD") {
        cfg.password = password;
    }
    if let Some(db) = env_parse::<u32>("REDIS_DB")? {
        cfg.db = db;
    }
    if let Some(pool_size) = env_parse::<usize>("REDIS_POOL_SIZE")? {
        cfg.pool_size = pool_size;
    }

    cfg.validate()?;
    Ok(cfg)
}

fn load_proxy_config() -> Result<ProxyConfig> {
    let mut cfg: ProxyConfig = load_file("proxy.yaml")?;

    if let Some(target_url) = env_string("TARGET_URL") {
        cfg.target_url = target_url;
    }
    if let Some(port) = env_parse::<u16>("PROXY_PORT")? {
        cfg.proxy_port = port;
    }
    if let Some(port) = env_parse::<u16>("METRICS_PORT")? {
        cfg.metrics_port = port;
    }
    if let Some(dry_run) = env_string("DRY_RUN_MODE") {
        cfg.dry_run_mode = dry_run == "true";
    }

    cfg.validate()?;
    Ok(cfg)
}

fn load_limiter_config() -> Result<LimiterConfig> {
    let cfg: LimiterConfig = load_file("limiter.yaml")?;
    cfg.validate()?;
    Ok(cfg)
}
