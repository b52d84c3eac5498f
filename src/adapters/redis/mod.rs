//! Redis adapter for job status persistence.
//!
//! This module provides the Redis-backed implementation of
//! `StatusStore` used by the encode worker and the polling API.

mod error;
mod pool;
mod status_store;

pub use error::StoreError;
pub use pool::RedisPool;

/// Redis key constants
const VIDEO_STATUS_PREFIX: &str = "mockingbird:video_status:";
