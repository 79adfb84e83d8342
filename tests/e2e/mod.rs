//! End-to-end tests against a real Redis
//!
//! All tests here are `#[ignore]`d; run them with `cargo test -- --ignored`
//! and a Redis reachable at `REDIS_ADDRESS` (default `127.0.0.1:6379`).

mod algorithms;
mod pipeline;
