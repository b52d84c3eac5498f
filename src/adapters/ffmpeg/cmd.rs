use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command as TokioCommand;

/// Seam for the ffprobe/ffmpeg invocations, so encoding behavior can be
/// exercised without the binaries installed.
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait EncodeExecutor {
    async fn run_ffprobe_streams(&self, source: &Path) -> io::Result<Output>;
    async fn run_ffmpeg_hls(
        &self,
        source: &Path,
        height: u32,
        video_bitrate: &str,
        playlist_path: &PathBuf,
        segment_pattern: &PathBuf,
    ) -> io::Result<Output>;
}

pub struct RealEncodeExecutor;

#[async_trait]
impl EncodeExecutor for RealEncodeExecutor {
    async fn run_ffprobe_streams(&self, source: &Path) -> io::Result<Output> {
        TokioCommand::new("ffprobe")
            .arg("-v").arg("error")
            .arg("-show_streams")
            .arg("-of").arg("default=noprint_wrappers=1")
            .arg(source)
            .output()
            .await
    }

    async fn run_ffmpeg_hls(
        &self,
        source: &Path,
        height: u32,
        video_bitrate: &str,
        playlist_path: &PathBuf,
        segment_pattern: &PathBuf,
    ) -> io::Result<Output> {
        TokioCommand::new("ffmpeg")
            .arg("-y")
            .arg("-i").arg(source)
            .arg("-vf").arg(format!("scale=-2:{}", height))
            .arg("-c:v").arg("libx264")
            .arg("-b:v").arg(video_bitrate)
            .arg("-c:a").arg("aac")
            .arg("-f").arg("hls")
            .arg("-hls_time").arg("6")
            .arg("-hls_playlist_type").arg("vod")
            .arg("-hls_segment_filename").arg(segment_pattern)
            .arg(playlist_path)
            .output()
            .await
    }
}
