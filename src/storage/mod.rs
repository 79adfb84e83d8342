//! Storage layer
//!
//! The proxy process owns no durable state; everything of interest lives in
//! the shared key-value store so replicas converge without coordination.

pub mod redis;

pub use redis::RedisPool;
