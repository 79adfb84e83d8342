//! Utility modules for TrafficCTRL
//!
//! - **error**: Error handling and the crate-wide `Result` alias
//! - **logging**: Structured logging setup driven by `logger.yaml`

pub mod error;
pub mod logging;

pub use error::{ProxyError, Result};
