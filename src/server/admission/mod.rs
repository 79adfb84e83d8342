//! Admission pipeline
//!
//! The ordered stages every request passes through before it reaches the
//! origin: metadata, classification, dry-run, then the three limit tiers.
//! Stages run sequentially inside one handler task; every store error fails
//! open. The panic barrier wrapping this pipeline lives in
//! [`crate::server::handler`].

mod context;
mod response;

pub use context::{MatchedRoute, RequestContext, STORE_CALL_DEADLINE};
pub use response::Denial;

use crate::config::LimitLevel;
use crate::core::classifier;
use crate::server::state::AppState;
use actix_web::{HttpMessage, HttpRequest};
use tracing::{debug, error, warn};
use uuid::Uuid;

/// The pipeline's verdict for one request.
#[derive(Debug)]
pub enum Admission {
    /// Hand the request to the forwarder.
    Forward,
    /// Reject with a shaped 429.
    Deny(Denial),
}

/// Run the admission stages for one request.
pub async fn evaluate(req: &HttpRequest, state: &AppState, ctx: &mut RequestContext) -> Admission {
    // --- metadata ---
    ctx.request_id = req
        .headers()
        .get("X-Request-ID")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    ctx.client_ip = classifier::extract_ip(req);

    let span = tracing::Span::current();
    span.record("request_id", ctx.request_id.as_str());
    span.record("client_ip", ctx.client_ip.as_str());

    // --- classification ---
    let rules = &state.config.limiter.per_endpoint.rules;
    let rule = match classifier::match_rule(rules, req.path(), req.method().as_str()) {
        Some(rule) => rule,
        None => {
            warn!("no endpoint rule matched, forwarding request to origin");
            state.metrics.bypassed_requests.inc();
            return Admission::Forward;
        }
    };

    if rule.bypass {
        warn!(rule_path = %rule.path, "rate limiter bypassed, forwarding request to origin");
        state.metrics.bypassed_requests.inc();
        return Admission::Forward;
    }

    req.extensions_mut()
        .insert(MatchedRoute(rule.path.clone()));
    ctx.rule = Some(rule.clone());

    match classifier::extract_tenant_key(req, rule.tenant_strategy.as_ref()) {
        Ok(tenant_key) => ctx.tenant_key = tenant_key,
        Err(e) => {
            error!(error = %e, "failed to extract tenant key, forwarding request to origin");
            return Admission::Forward;
        }
    }

    // --- dry run ---
    if state.config.proxy.dry_run_mode {
        dry_run(state, ctx).await;
        return Admission::Forward;
    }

    // --- global tier ---
    if let Some(denial) = check_global_tier(state, ctx).await {
        return Admission::Deny(denial);
    }

    // --- tenant tier ---
    if let Some(denial) = check_tenant_tier(state, ctx).await {
        return Admission::Deny(denial);
    }

    // --- endpoint tier ---
    if let Some(denial) = check_endpoint_tier(state, ctx).await {
        return Admission::Deny(denial);
    }

    Admission::Forward
}

/// Global tier: a deny here is not final; well-reputed tenants override it.
async fn check_global_tier(state: &AppState, ctx: &RequestContext) -> Option<Denial> {
    let cfg = &state.config.limiter.global;
    if !cfg.enabled {
        return None;
    }

    let result = match state.limiter.check_global(cfg, ctx.deadline).await {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, "failed to enforce global limit");
            state
                .metrics
                .record_tier_error(LimitLevel::Global, e.is_store_error());
            return None;
        }
    };

    if result.allowed {
        return None;
    }

    debug!("global limit reached, server on high load, applying reputation checks");

    let reputation = state
        .limiter
        .tenant_reputation(&ctx.tenant_key, ctx.deadline)
        .await;
    state.metrics.reputation_distribution.observe(reputation.score);

    if reputation.score <= state.limiter.reputation_threshold() {
        state.metrics.record_denial(LimitLevel::Global);
        return Some(Denial::Reputation { reputation, result });
    }

    debug!(
        reputation_score = reputation.score,
        good_requests = reputation.good_requests,
        reputation_ttl = reputation.ttl,
        "reputation check passed, admitting despite global limit"
    );
    None
}

async fn check_tenant_tier(state: &AppState, ctx: &RequestContext) -> Option<Denial> {
    let cfg = &state.config.limiter.per_tenant;
    if !cfg.enabled {
        return None;
    }

    let result = match state
        .limiter
        .check_tenant(&ctx.tenant_key, cfg, ctx.deadline)
        .await
    {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, "failed to enforce tenant limit");
            state
                .metrics
                .record_tier_error(LimitLevel::PerTenant, e.is_store_error());
            return None;
        }
    };

    if !result.allowed {
        record_reputation(state, ctx, true).await;
        state.metrics.record_denial(LimitLevel::PerTenant);
        return Some(Denial::Limit {
            level: LimitLevel::PerTenant,
            result,
        });
    }

    debug!(remaining_tenant = result.remaining, "tenant rate limit check passed");
    record_reputation(state, ctx, false).await;
    None
}

async fn check_endpoint_tier(state: &AppState, ctx: &RequestContext) -> Option<Denial> {
    let rule = ctx.rule.as_ref()?;

    let result = match state
        .limiter
        .check_endpoint(&ctx.tenant_key, rule, ctx.deadline)
        .await
    {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, "failed to enforce endpoint limit");
            state
                .metrics
                .record_tier_error(LimitLevel::PerEndpoint, e.is_store_error());
            return None;
        }
    };

    if !result.allowed {
        record_reputation(state, ctx, true).await;
        state.metrics.record_denial(LimitLevel::PerEndpoint);
        return Some(Denial::Limit {
            level: LimitLevel::PerEndpoint,
            result,
        });
    }

    debug!(
        remaining_endpoint = result.remaining,
        "endpoint rate limit check passed"
    );
    state.metrics.allowed_requests.inc();
    record_reputation(state, ctx, false).await;
    None
}

/// Reputation updates never affect admission; failures are only logged.
async fn record_reputation(state: &AppState, ctx: &RequestContext, is_violation: bool) {
    if let Err(e) = state
        .limiter
        .update_reputation(&ctx.tenant_key, is_violation, ctx.deadline)
        .await
    {
        error!(error = %e, "failed to update reputation");
    }
}

/// Dry-run: run every tier, log what would have happened, admit regardless.
/// Reputation is deliberately untouched here.
async fn dry_run(state: &AppState, ctx: &RequestContext) {
    let cfg = &state.config.limiter;

    let global = state.limiter.check_global(&cfg.global, ctx.deadline).await;
    if let Err(e) = &global {
        error!(error = %e, "failed to check global limit (dry run)");
    }

    let tenant = state
        .limiter
        .check_tenant(&ctx.tenant_key, &cfg.per_tenant, ctx.deadline)
        .await;
    if let Err(e) = &tenant {
        error!(error = %e, "failed to check tenant limit (dry run)");
    }

    let endpoint = match &ctx.rule {
        Some(rule) => {
            let checked = state
                .limiter
                .check_endpoint(&ctx.tenant_key, rule, ctx.deadline)
                .await;
            if let Err(e) = &checked {
                error!(error = %e, "failed to check endpoint limit (dry run)");
            }
            checked
        }
        None => Ok(crate::core::limiter::LimitResult::pass()),
    };

    let mut all_allowed = true;
    for (level, outcome) in [
        (LimitLevel::Global, &global),
        (LimitLevel::PerTenant, &tenant),
        (LimitLevel::PerEndpoint, &endpoint),
    ] {
        if let Ok(result) = outcome {
            if !result.allowed {
                all_allowed = false;
                warn!(
                    limit_level = %level,
                    retry_after = result.retry_after.as_secs_f64(),
                    "limit would have been exceeded (dry run)"
                );
            }
        }
    }

    if all_allowed {
        debug!("all rate limit checks passed (dry run)");
    }
}
