//! Request-scoped context threaded through the admission stages

use crate::config::EndpointRule;
use std::time::{Duration, Instant};

/// Deadline shared by every store call made on behalf of one request.
pub const STORE_CALL_DEADLINE: Duration = Duration::from_secs(5);

/// Mutable context filled in as the stages run.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub client_ip: String,
    pub tenant_key: String,
    /// The matched endpoint rule; `None` until classification, and for
    /// bypassed requests.
    pub rule: Option<EndpointRule>,
    /// Absolute deadline for store calls in later stages.
    pub deadline: Instant,
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            request_id: String::new(),
            client_ip: String::new(),
            tenant_key: String::new(),
            rule: None,
            deadline: Instant::now() + STORE_CALL_DEADLINE,
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Marker stored in request extensions once a non-bypass rule matched;
/// the metrics middleware uses it as the `endpoint` label.
#[derive(Debug, Clone)]
pub struct MatchedRoute(pub String);
