use async_trait::async_trait;
use std::error::Error;
use std::path::{Path, PathBuf};

#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Encode a source video into one or more renditions on durable storage.
    /// May take unbounded wall-clock time; returns the produced output paths.
    async fn encode(
        &self,
        source_path: &Path,
    ) -> Result<Vec<PathBuf>, Box<dyn Error + Send + Sync>>;
}
