//! Request metrics middleware
//!
//! Counts classified requests and observes their latency after the response
//! is produced; the admission pipeline marks classified requests by leaving
//! a [`MatchedRoute`] in the request extensions, which becomes the
//! `endpoint` label.

use crate::monitoring::Metrics;
use crate::server::admission::MatchedRoute;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::HttpMessage;
use futures::future::{ready, Ready};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

/// Metrics middleware for the proxy listener
pub struct RequestMetricsMiddleware {
    metrics: Arc<Metrics>,
}

impl RequestMetricsMiddleware {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self { metrics }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequestMetricsMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type InitError = ();
    type Transform = RequestMetricsService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestMetricsService {
            service,
            metrics: Arc::clone(&self.metrics),
        }))
    }
}

/// Service implementation for the metrics middleware
pub struct RequestMetricsService<S> {
    service: S,
    metrics: Arc<Metrics>,
}

impl<S, B> Service<ServiceRequest> for RequestMetricsService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let metrics = Arc::clone(&self.metrics);
        let method = req.method().to_string();
        let start = Instant::now();

        metrics.requests_in_flight.inc();

        let fut = self.service.call(req);

        Box::pin(async move {
            let result = fut.await;
            metrics.requests_in_flight.dec();

            let res = result?;

            {
                let extensions = res.request().extensions();
                if let Some(route) = extensions.get::<MatchedRoute>() {
                    metrics
                        .total_requests
                        .with_label_values(&[&method, &route.0])
                        .inc();
                    metrics
                        .request_duration
                        .with_label_values(&[&method, &route.0])
                        .observe(start.elapsed().as_secs_f64());
                }
            }

            Ok(res)
        })
    }
}
