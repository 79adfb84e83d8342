//! Catch-all proxy handler
//!
//! Wraps the admission pipeline in a panic barrier: whatever goes wrong in
//! admission, the request is still forwarded. The proxy must never deny on
//! the basis of its own failure.

use crate::server::admission::{self, Admission, RequestContext};
use crate::server::forwarder;
use crate::server::state::AppState;
use actix_web::{web, HttpRequest, HttpResponse};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tracing::{error, Instrument};

/// Entry point for every proxied request.
pub async fn proxy_entry(
    req: HttpRequest,
    payload: web::Payload,
    state: web::Data<AppState>,
) -> HttpResponse {
    let span = tracing::info_span!(
        "request",
        path = %req.path(),
        method = %req.method(),
        request_id = tracing::field::Empty,
        client_ip = tracing::field::Empty,
    );

    async move {
        let mut ctx = RequestContext::new();

        let verdict = AssertUnwindSafe(admission::evaluate(&req, &state, &mut ctx))
            .catch_unwind()
            .await;

        match verdict {
            Err(_) => {
                state.metrics.panic_recoveries.inc();
                error!("panic recovered in admission pipeline, forwarding request to origin");
                forwarder::forward(&req, payload, &state, &ctx).await
            }
            Ok(Admission::Deny(denial)) => denial.into_response(),
            Ok(Admission::Forward) => forwarder::forward(&req, payload, &state, &ctx).await,
        }
    }
    .instrument(span)
    .await
}
