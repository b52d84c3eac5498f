use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// One requested video encode.
///
/// The job owns `source_path` exclusively until encoding completes or fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodeJob {
    pub id: String,
    pub source_path: PathBuf,
    pub enqueued_at: DateTime<Utc>,
}

impl EncodeJob {
    /// Build a job for an uploaded file. Returns `None` when no id can be
    /// derived from the path (no base name, or not valid UTF-8).
    pub fn from_source(source_path: PathBuf) -> Option<Self> {
        let id = job_id_for(&source_path)?;
        Some(Self {
            id,
            source_path,
            enqueued_at: Utc::now(),
        })
    }
}

/// Derive a job id from an upload path: the file's base name with the final
/// extension stripped. `"/tmp/uploads/clip42.mp4"` -> `"clip42"`.
pub fn job_id_for(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    if stem.is_empty() {
        return None;
    }
    Some(stem.to_string())
}

/// Encoding status of a job. Persisted as its numeric code.
///
/// `Queued` and `Processing` are transient; `Success` and `Failed` are
/// terminal once the retry budget is spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum JobStatus {
    Queued = 0,
    Processing = 1,
    Success = 2,
    Failed = 3,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Success => "success",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<JobStatus> for u8 {
    fn from(status: JobStatus) -> Self {
        status as u8
    }
}

impl TryFrom<u8> for JobStatus {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(JobStatus::Queued),
            1 => Ok(JobStatus::Processing),
            2 => Ok(JobStatus::Success),
            3 => Ok(JobStatus::Failed),
            other => Err(format!("unknown job status code: {}", other)),
        }
    }
}

/// Persisted projection of a job's current status. One record per job id,
/// upserted on every transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRecord {
    pub id: String,
    pub status: JobStatus,
    pub updated_at: DateTime<Utc>,
}

impl StatusRecord {
    pub fn new(id: impl Into<String>, status: JobStatus) -> Self {
        Self {
            id: id.into(),
            status,
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_strips_final_extension() {
        assert_eq!(
            job_id_for(Path::new("/tmp/uploads/clip42.mp4")),
            Some("clip42".to_string())
        );
        assert_eq!(
            job_id_for(Path::new("/tmp/uploads/archive.tar.gz")),
            Some("archive.tar".to_string())
        );
        assert_eq!(
            job_id_for(Path::new("bare_name")),
            Some("bare_name".to_string())
        );
    }

    #[test]
    fn test_job_id_rejects_pathological_paths() {
        assert_eq!(job_id_for(Path::new("")), None);
        assert_eq!(job_id_for(Path::new("..")), None);
    }

    #[test]
    fn test_status_codes_round_trip() {
        for status in [
            JobStatus::Queued,
            JobStatus::Processing,
            JobStatus::Success,
            JobStatus::Failed,
        ] {
            let code: u8 = status.into();
            assert_eq!(JobStatus::try_from(code).unwrap(), status);
        }
        assert!(JobStatus::try_from(42).is_err());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(JobStatus::Success.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn test_status_record_serializes_status_as_int() {
        let record = StatusRecord::new("clip42", JobStatus::Processing);
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"status\":1"));

        let parsed: StatusRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.status, JobStatus::Processing);
        assert_eq!(parsed.id, "clip42");
    }
}
