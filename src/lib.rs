//! # TrafficCTRL
//!
//! A rate-limiting reverse proxy. Sits between clients and a single origin
//! and enforces three tiers of limits (global, per-tenant, per-endpoint)
//! against a shared Redis store, so any number of proxy replicas cooperate
//! without in-process state.
//!
//! ## Features
//!
//! - **Four algorithms**: token bucket, leaky bucket, fixed window,
//!   sliding window; each decision is a single atomic Lua script
//! - **Tenant reputation**: under global overload, repeat violators are
//!   rejected first while well-behaved callers ride through
//! - **Fail-open**: store errors, classification errors, and panics all
//!   forward the request; the proxy never denies because it is broken
//! - **Dry-run**: evaluate and log every limit without rejecting
//! - **Prometheus metrics** on a dedicated port
//!
//! ## Quick start
//!
//! ```rust,no_run
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let config = trafficctrl::config::load()?;
//!     trafficctrl::server::run(config).await?;
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod core;
pub mod monitoring;
pub mod server;
pub mod storage;
pub mod utils;

pub use config::Config;
pub use utils::error::{ProxyError, Result};

/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Name of the crate
pub const NAME: &str = env!("CARGO_PKG_NAME");
