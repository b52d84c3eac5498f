//! HTTP inbound adapter.
//!
//! Thin ingest and status surface: multipart uploads are streamed to the
//! upload directory and handed to the encode queue; clients poll the status
//! of a job by id.

use crate::application::encode_queue::{EncodeQueue, EnqueueError};
use crate::domain::jobs::StatusRecord;
use crate::ports::status_store::StatusStore;
use crate::ports::transcoder::Transcoder;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Path as UrlPath, State},
    http::StatusCode,
    routing::{get, post},
    BoxError, Json, Router,
};
use futures::{Stream, TryStreamExt};
use serde::Serialize;
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::{fs::File, io::BufWriter};
use tokio_util::io::StreamReader;
use tracing::info;

pub struct ApiState<T, S> {
    pub queue: EncodeQueue<T, S>,
    pub store: S,
    pub upload_dir: PathBuf,
}

impl<T, S: Clone> Clone for ApiState<T, S> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
            store: self.store.clone(),
            upload_dir: self.upload_dir.clone(),
        }
    }
}

pub fn router<T, S>(state: ApiState<T, S>) -> Router
where
    T: Transcoder + 'static,
    S: StatusStore + Clone + 'static,
{
    Router::new()
        .route("/medias/upload-video", post(upload_video::<T, S>))
        .route("/medias/video-status/:id", get(video_status::<T, S>))
        .layer(DefaultBodyLimit::disable())
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct UploadedVideo {
    pub id: String,
    pub status_url: String,
}

// Handler that accepts a multipart form upload, streams each video field to
// the upload directory and registers an encode job for it.
async fn upload_video<T, S>(
    State(state): State<ApiState<T, S>>,
    mut multipart: Multipart,
) -> Result<Json<Vec<UploadedVideo>>, (StatusCode, String)>
where
    T: Transcoder + 'static,
    S: StatusStore + Clone + 'static,
{
    let mut uploaded = Vec::new();

    while let Ok(Some(field)) = multipart.next_field().await {
        let file_name = if let Some(file_name) = field.file_name() {
            file_name.to_owned()
        } else {
            continue;
        };

        if !file_name_is_valid(&file_name) {
            return Err((StatusCode::BAD_REQUEST, "Invalid file name".to_owned()));
        }

        let path = state.upload_dir.join(&file_name);
        info!("Saving new file to {:?}", path);
        stream_to_file(&path, field).await?;

        let id = match state.queue.enqueue(&path).await {
            Ok(id) => id,
            Err(e @ EnqueueError::EmptyPath) | Err(e @ EnqueueError::InvalidFileName(_)) => {
                return Err((StatusCode::BAD_REQUEST, e.to_string()))
            }
            Err(e) => return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
        };

        uploaded.push(UploadedVideo {
            status_url: format!("/medias/video-status/{}", id),
            id,
        });
    }

    if uploaded.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "No video file in request".to_owned()));
    }

    Ok(Json(uploaded))
}

async fn video_status<T, S>(
    State(state): State<ApiState<T, S>>,
    UrlPath(id): UrlPath<String>,
) -> Result<Json<StatusRecord>, (StatusCode, String)>
where
    T: Transcoder + 'static,
    S: StatusStore + Clone + 'static,
{
    match state.store.get_status(&id).await {
        Ok(Some(record)) => Ok(Json(record)),
        Ok(None) => Err((StatusCode::NOT_FOUND, "Video not found".to_owned())),
        Err(e) => Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

// Save a `Stream` to a file
async fn stream_to_file<S, E>(path: &PathBuf, stream: S) -> Result<(), (StatusCode, String)>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<BoxError>,
{
    async {
        let body_with_io_error = stream.map_err(|err| io::Error::new(io::ErrorKind::Other, err));
        let body_reader = StreamReader::new(body_with_io_error);
        futures::pin_mut!(body_reader);

        let mut file = BufWriter::new(File::create(path).await?);
        tokio::io::copy(&mut body_reader, &mut file).await?;

        Ok::<_, io::Error>(())
    }
    .await
    .map_err(|err| (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))
}

// An upload name must be a single plain path component.
fn file_name_is_valid(name: &str) -> bool {
    if name.is_empty() || name.contains('\\') {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures::stream;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_stream_to_file() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("test_file.txt");

        type E = std::io::Error;

        let test_data = "Hello, world!";
        let mock_stream = stream::iter(vec![Ok::<bytes::Bytes, E>(Bytes::from(test_data))]);

        let result = stream_to_file(&file_path, mock_stream).await;

        assert!(result.is_ok());

        let file_contents = fs::read_to_string(file_path).unwrap();
        assert_eq!(file_contents, test_data);
    }

    #[tokio::test]
    async fn test_stream_to_file_error() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("test_file.txt");

        let mock_stream = stream::iter(vec![Err("Test error")]);

        let result = stream_to_file(&file_path, mock_stream).await;

        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err(),
            (StatusCode::INTERNAL_SERVER_ERROR, "Test error".to_string())
        );
    }

    #[test]
    fn test_valid_file_name() {
        assert!(file_name_is_valid("clip42.mp4"));
        assert!(file_name_is_valid("clip with spaces.mov"));
    }

    #[test]
    fn test_invalid_file_name_with_parent() {
        assert!(!file_name_is_valid("../escape.mp4"));
        assert!(!file_name_is_valid(".."));
    }

    #[test]
    fn test_invalid_file_name_with_separators() {
        assert!(!file_name_is_valid("dir1/dir2.mp4"));
        assert!(!file_name_is_valid("/absolute.mp4"));
        assert!(!file_name_is_valid("win\\style.mp4"));
    }

    #[test]
    fn test_invalid_empty_file_name() {
        assert!(!file_name_is_valid(""));
    }
}
