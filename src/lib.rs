//! Mockingbird - Video Encoding Pipeline
//!
//! Hexagonal Architecture:
//! - domain/: Pure business logic (jobs, playlists)
//! - ports/: Trait definitions
//! - adapters/: Concrete implementations (Redis, ffmpeg, HTTP)
//! - application/: Generic services
//! - config: Environment configuration

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports for convenience
pub use application::encode_queue::{EncodeQueue, EnqueueError, RetryPolicy};
pub use config::Config;
pub use domain::jobs::{EncodeJob, JobStatus, StatusRecord};
