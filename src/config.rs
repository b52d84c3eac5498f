//! Environment configuration.

use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    /// HTTP server bind address
    pub addr: String,
    /// HTTP server port
    pub port: String,
    /// Redis connection URL
    pub redis_url: String,
    /// Directory where raw uploads land
    pub upload_dir: String,
    /// Directory for encoded renditions
    pub output_dir: String,
    /// Encode attempts per job before giving up
    pub max_encode_attempts: u32,
    /// Base backoff between attempts, in milliseconds
    pub encode_retry_base_ms: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        Self {
            addr: env::var("ADDR").unwrap_or_else(|_| String::from("127.0.0.1")),
            port: env::var("PORT").unwrap_or_else(|_| String::from("3000")),
            redis_url: env::var("REDIS_URL").unwrap_or_else(|_| String::from("redis://127.0.0.1/")),
            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| String::from("./uploads/videos")),
            output_dir: env::var("OUTPUT_DIR").unwrap_or_else(|_| String::from("./uploads/hls")),
            max_encode_attempts: env::var("MAX_ENCODE_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            encode_retry_base_ms: env::var("ENCODE_RETRY_BASE_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(500),
        }
    }
}
