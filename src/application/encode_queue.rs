use crate::domain::jobs::{EncodeJob, JobStatus};
use crate::ports::status_store::StatusStore;
use crate::ports::transcoder::Transcoder;
use std::collections::VecDeque;
use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{error, info, warn};

/// Retry policy for failed encode attempts.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per job, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles per attempt after that.
    pub base_delay: Duration,
    /// Cap on the backoff delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    fn delay_after_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let delay = self.base_delay.saturating_mul(2u32.saturating_pow(exponent));
        delay.min(self.max_delay)
    }
}

#[derive(Debug)]
pub enum EnqueueError {
    EmptyPath,
    InvalidFileName(PathBuf),
    Store(Box<dyn Error + Send + Sync>),
}

impl fmt::Display for EnqueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnqueueError::EmptyPath => write!(f, "source path must not be empty"),
            EnqueueError::InvalidFileName(path) => {
                write!(f, "no job id can be derived from {:?}", path)
            }
            EnqueueError::Store(e) => write!(f, "status store error: {}", e),
        }
    }
}

impl Error for EnqueueError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            EnqueueError::Store(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

struct Inner<T, S> {
    transcoder: T,
    store: S,
    retry: RetryPolicy,
    backlog: Mutex<VecDeque<EncodeJob>>,
    draining: AtomicBool,
}

/// Ordered backlog of encode jobs with a single-flight worker.
///
/// `enqueue` appends to the backlog and wakes the worker; at most one encode
/// runs at any instant, jobs are processed strictly in enqueue order, and a
/// job that keeps failing is dropped after the retry budget so it cannot
/// starve the ones behind it.
pub struct EncodeQueue<T, S> {
    inner: Arc<Inner<T, S>>,
}

impl<T, S> Clone for EncodeQueue<T, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, S> EncodeQueue<T, S>
where
    T: Transcoder + 'static,
    S: StatusStore + 'static,
{
    pub fn new(transcoder: T, store: S, retry: RetryPolicy) -> Self {
        Self {
            inner: Arc::new(Inner {
                transcoder,
                store,
                retry,
                backlog: Mutex::new(VecDeque::new()),
                draining: AtomicBool::new(false),
            }),
        }
    }

    /// Number of jobs currently in the backlog (including the one being
    /// encoded).
    pub fn backlog_len(&self) -> usize {
        self.inner.backlog.lock().unwrap().len()
    }

    /// Register a new encode job and wake the worker if it is idle.
    ///
    /// Writes the initial status record before the job becomes visible to
    /// the worker, then returns; the encode itself runs in the background.
    pub async fn enqueue(&self, source_path: &Path) -> Result<String, EnqueueError> {
        if source_path.as_os_str().is_empty() {
            return Err(EnqueueError::EmptyPath);
        }
        let job = EncodeJob::from_source(source_path.to_path_buf())
            .ok_or_else(|| EnqueueError::InvalidFileName(source_path.to_path_buf()))?;

        self.inner
            .store
            .set_status(&job.id, JobStatus::Processing)
            .await
            .map_err(EnqueueError::Store)?;

        let id = job.id.clone();
        self.inner.backlog.lock().unwrap().push_back(job);
        info!(job_id = %id, "enqueued video for encoding");

        self.spawn_drain_if_idle();
        Ok(id)
    }

    fn spawn_drain_if_idle(&self) {
        if self
            .inner
            .draining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            let queue = self.clone();
            tokio::spawn(async move { queue.drain().await });
        }
    }

    /// Worker loop. Runs while the single-flight guard is held, processing
    /// the backlog head-to-tail. The backlog lock is never held across an
    /// encode, so producers can keep appending during a long-running job.
    async fn drain(&self) {
        loop {
            while let Some(job) = self.peek_head() {
                match self.run_job(&job).await {
                    Ok(JobStatus::Success) => {
                        self.pop_head(&job.id);
                        if let Err(e) = self
                            .inner
                            .store
                            .set_status(&job.id, JobStatus::Success)
                            .await
                        {
                            error!(job_id = %job.id, error = %e, "status store unavailable, stopping worker");
                            self.inner.draining.store(false, Ordering::Release);
                            return;
                        }
                        self.remove_source(&job).await;
                    }
                    Ok(_) => {
                        // Retry budget exhausted; the final Failed write
                        // already happened. Drop the job so the backlog
                        // keeps moving.
                        self.pop_head(&job.id);
                    }
                    Err(e) => {
                        // Persistence outage, not a job defect. Leave the
                        // job at the head; the next enqueue restarts us.
                        error!(job_id = %job.id, error = %e, "status store unavailable, stopping worker");
                        self.inner.draining.store(false, Ordering::Release);
                        return;
                    }
                }
            }

            self.inner.draining.store(false, Ordering::Release);
            // A producer may have appended after our last peek and lost the
            // guard race; re-acquire and keep going if so.
            if self.inner.backlog.lock().unwrap().is_empty() {
                return;
            }
            if self
                .inner
                .draining
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return;
            }
        }
    }

    /// Drive one job to a terminal status. `Ok` carries the job outcome;
    /// `Err` means a status write failed and the drain attempt must stop.
    async fn run_job(&self, job: &EncodeJob) -> Result<JobStatus, Box<dyn Error + Send + Sync>> {
        self.inner
            .store
            .set_status(&job.id, JobStatus::Processing)
            .await?;

        let mut attempt = 1u32;
        loop {
            match self.inner.transcoder.encode(&job.source_path).await {
                Ok(outputs) => {
                    info!(job_id = %job.id, renditions = outputs.len(), "encode finished");
                    return Ok(JobStatus::Success);
                }
                Err(e) => {
                    warn!(
                        job_id = %job.id,
                        attempt,
                        max_attempts = self.inner.retry.max_attempts,
                        error = %e,
                        "encode attempt failed"
                    );
                    self.inner
                        .store
                        .set_status(&job.id, JobStatus::Failed)
                        .await?;

                    if attempt >= self.inner.retry.max_attempts {
                        warn!(job_id = %job.id, "retry budget exhausted, giving up");
                        return Ok(JobStatus::Failed);
                    }

                    tokio::time::sleep(self.inner.retry.delay_after_attempt(attempt)).await;
                    attempt += 1;
                    self.inner
                        .store
                        .set_status(&job.id, JobStatus::Processing)
                        .await?;
                }
            }
        }
    }

    /// The raw upload belongs to the job; once all renditions exist it has
    /// no further use.
    async fn remove_source(&self, job: &EncodeJob) {
        if let Err(e) = tokio::fs::remove_file(&job.source_path).await {
            warn!(job_id = %job.id, error = %e, "could not remove consumed upload");
        }
    }

    fn peek_head(&self) -> Option<EncodeJob> {
        self.inner.backlog.lock().unwrap().front().cloned()
    }

    fn pop_head(&self, id: &str) {
        let mut backlog = self.inner.backlog.lock().unwrap();
        if backlog.front().map(|j| j.id.as_str()) == Some(id) {
            backlog.pop_front();
        }
    }
}
