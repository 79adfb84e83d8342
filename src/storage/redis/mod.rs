//! Redis storage implementation
//!
//! All durable state (limit records, reputation records) lives in Redis;
//! this module only provides connectivity. The atomic scripts that operate
//! on that state live with the limiter in [`crate::core::limiter`].

mod pool;

pub use pool::RedisPool;
