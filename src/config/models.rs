//! Configuration data model
//!
//! One struct per YAML file (`proxy.yaml`, `redis.yaml`, `logger.yaml`,
//! `limiter.yaml`), plus the algorithm/tenant-strategy unions shared by the
//! limiter tiers. Durations are written as humantime strings ("1m", "500ms").

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::time::Duration;

/// Admission tier. Appears in denial bodies and metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitLevel {
    Global,
    PerTenant,
    PerEndpoint,
}

impl LimitLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LimitLevel::Global => "global",
            LimitLevel::PerTenant => "per_tenant",
            LimitLevel::PerEndpoint => "per_endpoint",
        }
    }
}

impl fmt::Display for LimitLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Duration parsed from a humantime string ("1s", "500ms", "2m").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HumanDuration(pub Duration);

impl HumanDuration {
    pub fn from_millis(ms: u64) -> Self {
        Self(Duration::from_millis(ms))
    }

    pub fn as_millis(&self) -> u64 {
        self.0.as_millis() as u64
    }
}

impl<'de> Deserialize<'de> for HumanDuration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let parsed = humantime::parse_duration(&raw)
            .map_err(|e| D::Error::custom(format!("invalid duration {raw:?}: {e}")))?;
        Ok(Self(parsed))
    }
}

impl Serialize for HumanDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(self.0).to_string())
    }
}

/// Rate-limit algorithm parameters, discriminated by the `algorithm` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "snake_case")]
pub enum AlgorithmParams {
    TokenBucket {
        capacity: u64,
        refill_rate: u64,
        refill_period: HumanDuration,
    },
    LeakyBucket {
        capacity: u64,
        leak_rate: u64,
        leak_period: HumanDuration,
    },
    FixedWindow {
        window_size: HumanDuration,
        limit: u64,
    },
    SlidingWindow {
        window_size: HumanDuration,
        limit: u64,
    },
}

impl AlgorithmParams {
    /// Short algorithm tag used in fingerprints and error messages.
    pub fn tag(&self) -> &'static str {
        match self {
            AlgorithmParams::TokenBucket { .. } => "token_bucket",
            AlgorithmParams::LeakyBucket { .. } => "leaky_bucket",
            AlgorithmParams::FixedWindow { .. } => "fixed_window",
            AlgorithmParams::SlidingWindow { .. } => "sliding_window",
        }
    }
}

/// How the caller identity is derived for a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TenantStrategy {
    Ip,
    Header { key: String },
    Cookie { key: String },
    QueryParameter { key: String },
}

/// One entry of the endpoint routing table; first match wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointRule {
    pub path: String,
    #[serde(default)]
    pub methods: Vec<String>,
    #[serde(default)]
    pub bypass: bool,
    #[serde(default)]
    pub tenant_strategy: Option<TenantStrategy>,
    #[serde(flatten)]
    pub algorithm: Option<AlgorithmParams>,
}

/// Global tier configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalLimit {
    pub enabled: bool,
    #[serde(flatten)]
    pub algorithm: Option<AlgorithmParams>,
}

/// Per-tenant tier configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerTenantLimit {
    pub enabled: bool,
    #[serde(flatten)]
    pub algorithm: Option<AlgorithmParams>,
}

/// Per-endpoint tier configuration: the ordered routing table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerEndpointLimit {
    #[serde(default)]
    pub rules: Vec<EndpointRule>,
}

/// `limiter.yaml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimiterConfig {
    pub global: GlobalLimit,
    pub per_tenant: PerTenantLimit,
    pub per_endpoint: PerEndpointLimit,
}

/// `proxy.yaml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub target_url: String,
    pub proxy_port: u16,
    pub metrics_port: u16,
    pub server_name: String,
    #[serde(default)]
    pub dry_run_mode: bool,
}

/// `redis.yaml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedisConfig {
    pub address: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub db: u32,
    pub pool_size: usize,
}

/// `logger.yaml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggerConfig {
    pub level: String,
    pub environment: String,
    pub output_path: String,
}

/// Full configuration snapshot, immutable for the process lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub proxy: ProxyConfig,
    pub redis: RedisConfig,
    pub logger: LoggerConfig,
    pub limiter: LimiterConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            target_url: "http://localhost:3000".to_string(),
            proxy_port: 8080,
            metrics_port: 9090,
            server_name: "trafficctrl".to_string(),
            dry_run_mode: false,
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            address: "localhost:6379".to_string(),
            password: String::new(),
            db: 0,
            pool_size: 40,
        }
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            environment: "development".to_string(),
            output_path: "stdout".to_string(),
        }
    }
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            global: GlobalLimit {
                enabled: true,
                algorithm: Some(AlgorithmParams::TokenBucket {
                    capacity: 10_000,
                    refill_rate: 10_000,
                    refill_period: HumanDuration::from_millis(1_000),
                }),
            },
            per_tenant: PerTenantLimit {
                enabled: true,
                algorithm: Some(AlgorithmParams::TokenBucket {
                    capacity: 20,
                    refill_rate: 20,
                    refill_period: HumanDuration::from_millis(1_000),
                }),
            },
            per_endpoint: PerEndpointLimit {
                rules: vec![EndpointRule {
                    path: "*".to_string(),
                    methods: Vec::new(),
                    bypass: false,
                    tenant_strategy: Some(TenantStrategy::Ip),
                    algorithm: Some(AlgorithmParams::TokenBucket {
                        capacity: 10,
                        refill_rate: 10,
                        refill_period: HumanDuration::from_millis(1_000),
                    }),
                }],
            },
        }
    }
}
