//! ffmpeg adapter - Transcoder implementation shelling out to ffprobe/ffmpeg.

mod cmd;

pub use cmd::{EncodeExecutor, RealEncodeExecutor};

use crate::domain::jobs::job_id_for;
use crate::domain::playlist::MasterPlaylist;
use crate::ports::transcoder::Transcoder;
use async_trait::async_trait;
use regex::Regex;
use std::error::Error;
use std::path::{Path, PathBuf};
use tracing::info;

/// One tier of the encoding ladder.
pub struct Rendition {
    pub name: &'static str,
    pub height: u32,
    pub video_bitrate: &'static str,
    pub bandwidth: u64,
    pub resolution: &'static str,
}

/// Fixed two-tier ladder; every job gets both renditions.
pub const RENDITIONS: [Rendition; 2] = [
    Rendition {
        name: "720p",
        height: 720,
        video_bitrate: "2800k",
        bandwidth: 2_800_000,
        resolution: "1280x720",
    },
    Rendition {
        name: "480p",
        height: 480,
        video_bitrate: "1400k",
        bandwidth: 1_400_000,
        resolution: "854x480",
    },
];

#[derive(Debug)]
struct EncodeError(String);

impl std::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Error for EncodeError {}

/// Transcoder producing an HLS ladder under `<output_dir>/<job id>/`.
pub struct FfmpegTranscoder<E> {
    executor: E,
    output_dir: PathBuf,
}

impl<E> FfmpegTranscoder<E>
where
    E: EncodeExecutor + Send + Sync,
{
    pub fn new(executor: E, output_dir: PathBuf) -> Self {
        Self {
            executor,
            output_dir,
        }
    }

    /// Preflight: the upload must be probeable and contain a video stream.
    async fn probe_source(&self, source: &Path) -> Result<f64, Box<dyn Error + Send + Sync>> {
        let output = self
            .executor
            .run_ffprobe_streams(source)
            .await
            .map_err(|e| EncodeError(format!("ffprobe execution failed for {:?}: {}", source, e)))?;

        if !output.status.success() {
            return Err(EncodeError(format!(
                "ffprobe failed for {:?}: {}",
                source,
                String::from_utf8_lossy(&output.stderr)
            ))
            .into());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let video_re = Regex::new(r"(?m)^codec_type=video$").unwrap();
        if !video_re.is_match(&stdout) {
            return Err(EncodeError(format!("no video stream in {:?}", source)).into());
        }

        let duration_re = Regex::new(r"(?m)^duration=(\d+\.?\d*)$").unwrap();
        let duration = duration_re
            .captures(&stdout)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .unwrap_or(0.0);
        Ok(duration)
    }
}

#[async_trait]
impl<E> Transcoder for FfmpegTranscoder<E>
where
    E: EncodeExecutor + Send + Sync,
{
    async fn encode(
        &self,
        source_path: &Path,
    ) -> Result<Vec<PathBuf>, Box<dyn Error + Send + Sync>> {
        let id = job_id_for(source_path)
            .ok_or_else(|| EncodeError(format!("cannot derive output name from {:?}", source_path)))?;

        let duration = self.probe_source(source_path).await?;

        let dest_dir = self.output_dir.join(&id);
        tokio::fs::create_dir_all(&dest_dir).await?;

        let mut master = MasterPlaylist::new();
        master.independent_segments = true;
        let mut outputs = Vec::with_capacity(RENDITIONS.len() + 1);

        for rendition in &RENDITIONS {
            let playlist_path = dest_dir.join(format!("{}.m3u8", rendition.name));
            let segment_pattern = dest_dir.join(format!("{}_%03d.ts", rendition.name));

            let output = self
                .executor
                .run_ffmpeg_hls(
                    source_path,
                    rendition.height,
                    rendition.video_bitrate,
                    &playlist_path,
                    &segment_pattern,
                )
                .await
                .map_err(|e| {
                    EncodeError(format!("ffmpeg execution failed for {:?}: {}", source_path, e))
                })?;

            if !output.status.success() {
                return Err(EncodeError(format!(
                    "Error encoding {} rendition of {:?}: {}",
                    rendition.name,
                    source_path,
                    String::from_utf8_lossy(&output.stderr)
                ))
                .into());
            }

            master.add_variant(
                rendition.bandwidth,
                Some(rendition.resolution.to_string()),
                format!("{}.m3u8", rendition.name),
            );
            outputs.push(playlist_path);
        }

        let master_path = dest_dir.join("master.m3u8");
        master.write_to(&master_path).await?;
        outputs.push(master_path);

        info!(
            job_id = %id,
            duration_secs = duration,
            renditions = RENDITIONS.len(),
            "HLS ladder written"
        );

        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::cmd::MockEncodeExecutor;
    use super::*;
    use std::os::unix::process::ExitStatusExt;
    use std::process::{ExitStatus, Output};

    fn mock_output(stdout_str: &str, stderr_str: &str, success: bool) -> std::io::Result<Output> {
        Ok(Output {
            status: if success {
                ExitStatus::from_raw(0)
            } else {
                ExitStatus::from_raw(1)
            },
            stdout: stdout_str.as_bytes().to_vec(),
            stderr: stderr_str.as_bytes().to_vec(),
        })
    }

    const PROBE_WITH_VIDEO: &str =
        "index=0\ncodec_name=h264\ncodec_type=video\nduration=12.5\nindex=1\ncodec_name=aac\ncodec_type=audio\nduration=12.5\n";
    const PROBE_AUDIO_ONLY: &str = "index=0\ncodec_name=aac\ncodec_type=audio\nduration=12.5\n";

    #[tokio::test]
    async fn test_encode_produces_ladder_and_master_playlist() {
        let mut executor = MockEncodeExecutor::new();

        executor
            .expect_run_ffprobe_streams()
            .times(1)
            .returning(|_| {
                let output = mock_output(PROBE_WITH_VIDEO, "", true).unwrap();
                Box::pin(async move { Ok(output) })
            });

        executor
            .expect_run_ffmpeg_hls()
            .withf(|_, height, _, _, _| *height == 720 || *height == 480)
            .times(2)
            .returning(|_, _, _, _, _| {
                let output = mock_output("", "", true).unwrap();
                Box::pin(async move { Ok(output) })
            });

        let out_dir = tempfile::tempdir().unwrap();
        let transcoder = FfmpegTranscoder::new(executor, out_dir.path().to_path_buf());

        let outputs = transcoder
            .encode(Path::new("/tmp/uploads/clip42.mp4"))
            .await
            .unwrap();

        assert_eq!(outputs.len(), 3);
        assert!(outputs[0].ends_with("clip42/720p.m3u8"));
        assert!(outputs[1].ends_with("clip42/480p.m3u8"));
        assert!(outputs[2].ends_with("clip42/master.m3u8"));

        let master = std::fs::read_to_string(&outputs[2]).unwrap();
        assert!(master.contains("BANDWIDTH=2800000,RESOLUTION=1280x720"));
        assert!(master.contains("720p.m3u8"));
        assert!(master.contains("480p.m3u8"));
    }

    #[tokio::test]
    async fn test_encode_rejects_source_without_video_stream() {
        let mut executor = MockEncodeExecutor::new();

        executor
            .expect_run_ffprobe_streams()
            .times(1)
            .returning(|_| {
                let output = mock_output(PROBE_AUDIO_ONLY, "", true).unwrap();
                Box::pin(async move { Ok(output) })
            });
        executor.expect_run_ffmpeg_hls().times(0);

        let out_dir = tempfile::tempdir().unwrap();
        let transcoder = FfmpegTranscoder::new(executor, out_dir.path().to_path_buf());

        let err = transcoder
            .encode(Path::new("/tmp/uploads/podcast.mp4"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no video stream"));
    }

    #[tokio::test]
    async fn test_encode_surfaces_ffprobe_io_error() {
        let mut executor = MockEncodeExecutor::new();

        executor
            .expect_run_ffprobe_streams()
            .times(1)
            .returning(|_| {
                Box::pin(async move {
                    Err(std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        "ffprobe not found",
                    ))
                })
            });
        executor.expect_run_ffmpeg_hls().times(0);

        let out_dir = tempfile::tempdir().unwrap();
        let transcoder = FfmpegTranscoder::new(executor, out_dir.path().to_path_buf());

        let err = transcoder
            .encode(Path::new("/tmp/uploads/clip.mp4"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("ffprobe execution failed"));
    }

    #[tokio::test]
    async fn test_encode_surfaces_ffmpeg_stderr_on_failure() {
        let mut executor = MockEncodeExecutor::new();

        executor
            .expect_run_ffprobe_streams()
            .times(1)
            .returning(|_| {
                let output = mock_output(PROBE_WITH_VIDEO, "", true).unwrap();
                Box::pin(async move { Ok(output) })
            });
        executor
            .expect_run_ffmpeg_hls()
            .times(1)
            .returning(|_, _, _, _, _| {
                let output = mock_output("", "codec kaput", false).unwrap();
                Box::pin(async move { Ok(output) })
            });

        let out_dir = tempfile::tempdir().unwrap();
        let transcoder = FfmpegTranscoder::new(executor, out_dir.path().to_path_buf());

        let err = transcoder
            .encode(Path::new("/tmp/uploads/clip.mp4"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Error encoding 720p rendition"));
        assert!(err.to_string().contains("codec kaput"));
    }
}
