//! HTTP servers
//!
//! Two listeners: the proxy itself (a catch-all route feeding the admission
//! pipeline and the forwarder) and a metrics endpoint on its own port. The
//! proxy listener owns signal handling; when it stops, the metrics listener
//! is stopped with it.

pub mod admission;
pub mod forwarder;
pub mod handler;
pub mod middleware;
pub mod state;

pub use state::AppState;

use crate::config::Config;
use crate::core::limiter::RateLimiter;
use crate::monitoring::Metrics;
use crate::storage::RedisPool;
use crate::utils::error::{ProxyError, Result};
use actix_web::{web, App, HttpResponse, HttpServer};
use middleware::RequestMetricsMiddleware;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

async fn metrics_endpoint(state: web::Data<AppState>) -> HttpResponse {
    match state.metrics.render() {
        Ok(body) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(body),
        Err(e) => {
            error!(error = %e, "failed to render metrics");
            HttpResponse::InternalServerError().finish()
        }
    }
}

/// Connect to the store, build the shared state, and run both listeners
/// until shutdown.
pub async fn run(config: Config) -> Result<()> {
    let pool = RedisPool::connect(&config.redis).await?;
    pool.ping(Duration::from_secs(3)).await?;
    info!(
        address = %config.redis.address,
        db = config.redis.db,
        "redis connection established"
    );

    let limiter = RateLimiter::new(pool);
    let metrics = Arc::new(Metrics::new()?);
    let state = AppState::new(config.clone(), limiter, Arc::clone(&metrics))?;
    let data = web::Data::new(state);

    let proxy_addr = ("0.0.0.0", config.proxy.proxy_port);
    let metrics_addr = ("0.0.0.0", config.proxy.metrics_port);

    let proxy_server = {
        let data = data.clone();
        let metrics = Arc::clone(&metrics);
        HttpServer::new(move || {
            App::new()
                .app_data(data.clone())
                .wrap(RequestMetricsMiddleware::new(Arc::clone(&metrics)))
                .default_service(web::to(handler::proxy_entry))
        })
        .bind(proxy_addr)
        .map_err(|e| {
            ProxyError::Server(format!(
                "couldn't bind proxy listener on port {}: {e}",
                proxy_addr.1
            ))
        })?
        .run()
    };

    let metrics_server = {
        let data = data.clone();
        HttpServer::new(move || {
            App::new()
                .app_data(data.clone())
                .route("/metrics", web::get().to(metrics_endpoint))
        })
        .disable_signals()
        .bind(metrics_addr)
        .map_err(|e| {
            ProxyError::Server(format!(
                "couldn't bind metrics listener on port {}: {e}",
                metrics_addr.1
            ))
        })?
        .run()
    };

    info!(port = proxy_addr.1, "proxy server starting");
    info!(port = metrics_addr.1, "metrics server starting");

    let metrics_handle = metrics_server.handle();
    let metrics_task = tokio::spawn(metrics_server);

    let result = proxy_server.await;

    // the proxy listener is down (signal or fault); take metrics with it
    metrics_handle.stop(true).await;
    if let Err(e) = metrics_task.await {
        error!(error = %e, "metrics server task failed");
    }

    result.map_err(|e| ProxyError::Server(format!("proxy server failed: {e}")))
}
