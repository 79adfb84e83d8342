//! Core admission logic
//!
//! - **classifier**: endpoint-rule matching and tenant identification
//! - **limiter**: distributed rate limiting and tenant reputation

pub mod classifier;
pub mod limiter;
