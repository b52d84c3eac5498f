//! Server Binary - single-process deployment
//!
//! This is the main entry point. It wires up:
//! - Redis status store
//! - ffmpeg transcoder
//! - Encode queue with its background worker
//! - HTTP ingest/status API

use mockingbird::adapters::ffmpeg::{FfmpegTranscoder, RealEncodeExecutor};
use mockingbird::adapters::http::{router, ApiState};
use mockingbird::adapters::redis::RedisPool;
use mockingbird::application::encode_queue::{EncodeQueue, RetryPolicy};
use mockingbird::config::Config;
use std::path::PathBuf;
use std::time::Duration;

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    tracing_subscriber::fmt::init();

    // 1. Filesystem bootstrap
    for dir in [&config.upload_dir, &config.output_dir] {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("Failed to create directory {}: {:?}", dir, e);
            std::process::exit(1);
        }
    }

    // 2. Adapters
    let store = match RedisPool::new(&config.redis_url) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to connect to Redis: {:?}", e);
            std::process::exit(1);
        }
    };

    let transcoder = FfmpegTranscoder::new(RealEncodeExecutor, PathBuf::from(&config.output_dir));

    // 3. Application services
    let retry = RetryPolicy {
        max_attempts: config.max_encode_attempts,
        base_delay: Duration::from_millis(config.encode_retry_base_ms),
        ..RetryPolicy::default()
    };
    let queue = EncodeQueue::new(transcoder, store.clone(), retry);

    // 4. HTTP layer
    let state = ApiState {
        queue,
        store,
        upload_dir: PathBuf::from(&config.upload_dir),
    };
    let app = router(state);

    // 5. Start server
    let listener = tokio::net::TcpListener::bind(format!("{}:{}", config.addr, config.port))
        .await
        .expect("Failed to bind TCP listener");
    println!("Listening at {}:{}", config.addr, config.port);
    axum::serve(listener, app)
        .await
        .expect("Server failed to start");
}
