//! Limit-key construction and configuration fingerprints
//!
//! Keys are shared by every proxy replica, so their shape is part of the
//! wire contract with the store. Request-derived components (tenant key)
//! are sanitized before they get here.

use crate::config::{AlgorithmParams, LimitLevel};
use sha2::{Digest, Sha256};

const KEY_PREFIX: &str = "ctrl:limiter:";
const REPUTATION_PREFIX: &str = "ctrl:reputation:";

/// Build the store key for one tier.
pub fn limit_key(
    level: LimitLevel,
    endpoint_path: &str,
    endpoint_methods: &[String],
    tenant_key: &str,
) -> String {
    match level {
        // ctrl:limiter:global
        LimitLevel::Global => format!("{KEY_PREFIX}global"),
        // ctrl:limiter:pertenant:user123
        LimitLevel::PerTenant => format!("{KEY_PREFIX}pertenant:{tenant_key}"),
        // ctrl:limiter:perendpoint:GET_POST:/api/v2:user123
        LimitLevel::PerEndpoint => {
            let methods = endpoint_methods.join("_");
            format!("{KEY_PREFIX}perendpoint:{methods}:{endpoint_path}:{tenant_key}")
        }
    }
}

/// Build the reputation key for one tenant.
pub fn reputation_key(tenant_key: &str) -> String {
    format!("{REPUTATION_PREFIX}{tenant_key}")
}

/// Deterministic digest of the algorithm parameters.
///
/// Stored with every limit record; a mismatch on read means the operator
/// changed the configuration and the record is reset. SHA-256 gives the
/// separation guarantee; eight bytes keep the stored field short.
pub fn config_fingerprint(params: &AlgorithmParams) -> String {
    let canonical = match params {
        AlgorithmParams::TokenBucket {
            capacity,
            refill_rate,
            refill_period,
        } => format!("tb|{capacity}|{refill_rate}|{}", refill_period.as_millis()),
        AlgorithmParams::LeakyBucket {
            capacity,
            leak_rate,
            leak_period,
        } => format!("lb|{capacity}|{leak_rate}|{}", leak_period.as_millis()),
        AlgorithmParams::FixedWindow { window_size, limit } => {
            format!("fw|{}|{limit}", window_size.as_millis())
        }
        AlgorithmParams::SlidingWindow { window_size, limit } => {
            format!("sw|{}|{limit}", window_size.as_millis())
        }
    };

    let digest = Sha256::digest(canonical.as_bytes());
    digest[..8]
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}
