//! Tenant identification
//!
//! Resolves the caller identity per the matched rule's strategy and
//! sanitizes it for use inside store keys. Every empty extraction falls
//! back to the client IP, so a caller cannot dodge limits by dropping the
//! identifying header or cookie.

use crate::config::TenantStrategy;
use crate::utils::error::Result;
use actix_web::HttpRequest;
use tracing::warn;

/// Extract and sanitize the tenant key for a request.
///
/// A missing strategy or an empty extraction falls back to the IP with a
/// warning; a genuinely unresolvable identity is an error and the caller
/// is expected to bypass enforcement (fail open).
pub fn extract_tenant_key(req: &HttpRequest, strategy: Option<&TenantStrategy>) -> Result<String> {
    let Some(strategy) = strategy else {
        warn!(path = %req.path(), "tenant strategy missing, falling back to IP");
        return Ok(sanitize_tenant_key(&extract_ip(req)));
    };

    let raw = match strategy {
        TenantStrategy::Ip => extract_ip(req),
        TenantStrategy::Header { key } => extract_from_header(req, key),
        TenantStrategy::Cookie { key } => extract_from_cookie(req, key),
        TenantStrategy::QueryParameter { key } => extract_from_query(req, key),
    };

    if raw.is_empty() {
        warn!(
            strategy = ?strategy,
            path = %req.path(),
            "tenant key not found, falling back to IP"
        );
        return Ok(sanitize_tenant_key(&extract_ip(req)));
    }

    Ok(sanitize_tenant_key(&raw))
}

/// Client IP: `X-Real-IP`, else the first `X-Forwarded-For` hop, else the
/// peer address.
pub fn extract_ip(req: &HttpRequest) -> String {
    if let Some(real_ip) = header_str(req, "X-Real-IP") {
        if !real_ip.is_empty() {
            return real_ip.to_string();
        }
    }

    if let Some(forwarded) = header_str(req, "X-Forwarded-For") {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_default()
}

fn header_str<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
    req.headers().get(name).and_then(|v| v.to_str().ok())
}

fn extract_from_header(req: &HttpRequest, key: &str) -> String {
    header_str(req, key).map(str::trim).unwrap_or("").to_string()
}

fn extract_from_cookie(req: &HttpRequest, key: &str) -> String {
    req.cookie(key).map(|c| c.value().to_string()).unwrap_or_default()
}

fn extract_from_query(req: &HttpRequest, key: &str) -> String {
    url::form_urlencoded::parse(req.query_string().as_bytes())
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.into_owned())
        .unwrap_or_default()
}

/// Sanitize a tenant key before it becomes part of a store key.
///
/// Keeps letters and digits (any script) and `- _ . : @`; drops control
/// characters, whitespace, and other punctuation; truncates to 128
/// characters. Idempotent.
pub fn sanitize_tenant_key(input: &str) -> String {
    input
        .chars()
        .filter(|&c| {
            let code = c as u32;
            if code <= 31 || code == 127 {
                return false;
            }
            if c.is_whitespace() {
                return false;
            }
            matches!(c, '-' | '_' | '.' | ':' | '@') || c.is_alphanumeric()
        })
        .take(128)
        .collect()
}
