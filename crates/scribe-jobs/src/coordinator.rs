//! Entry point for submitting jobs and polling their progress.

use std::sync::Arc;

use tracing::{debug, error, info};
use uuid::Uuid;

use scribe_core::{defaults, validate_upload, Error, JobProgress, QueueStats, Result};

use crate::queue::{JobQueue, QueueEntry};
use crate::storage::{upload_locator, StorageBackend};
use crate::store::JobStore;

/// Accepts uploads, creates job records, and feeds the queue.
///
/// Submission never waits on processing: it stores the artifact, installs a
/// pending record, enqueues it, and returns the id.
pub struct JobCoordinator {
    store: Arc<JobStore>,
    queue: Arc<JobQueue>,
    inputs: Arc<dyn StorageBackend>,
    max_upload_bytes: usize,
}

impl JobCoordinator {
    pub fn new(store: Arc<JobStore>, queue: Arc<JobQueue>, inputs: Arc<dyn StorageBackend>) -> Self {
        Self {
            store,
            queue,
            inputs,
            max_upload_bytes: defaults::MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_upload_bytes(mut self, max: usize) -> Self {
        self.max_upload_bytes = max;
        self
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Submit an uploaded artifact for processing.
    ///
    /// Rejected uploads return [`Error::InvalidInput`] and create no record.
    /// If the queue no longer accepts work the new record is failed so it
    /// never sits in `pending` forever.
    pub async fn submit(&self, filename: Option<&str>, data: &[u8]) -> Result<Uuid> {
        let filename = filename.map(str::trim).filter(|f| !f.is_empty());
        validate_upload(
            filename.unwrap_or(defaults::UNNAMED_UPLOAD),
            data,
            self.max_upload_bytes,
        )?;

        let locator = upload_locator(filename);
        self.inputs.write(&locator, data).await.map_err(|e| {
            error!(%locator, error = %e, "Failed to store upload");
            Error::Storage(format!("Failed to store upload: {}", e))
        })?;

        let job_id = self
            .store
            .create(locator.clone(), filename.map(str::to_string));

        if let Err(e) = self.queue.enqueue(QueueEntry {
            job_id,
            input_locator: locator.clone(),
        }) {
            error!(%job_id, error = %e, "Failed to enqueue job");
            if let Err(fail_err) = self.store.fail(job_id, e.to_string()) {
                error!(%job_id, error = %fail_err, "Failed to mark unqueued job as failed");
            }
            return Err(e);
        }

        info!(
            %job_id,
            %locator,
            size_bytes = data.len(),
            queue_depth = self.queue.depth(),
            "Job submitted"
        );
        Ok(job_id)
    }

    /// Current progress of a job. Never blocks on processing.
    pub fn progress_of(&self, job_id: Uuid) -> Result<JobProgress> {
        let job = self.store.get(job_id)?;
        Ok(JobProgress::from(&job))
    }

    /// Request cancellation of a job.
    ///
    /// Returns `false` if the job already finished. The job becomes `failed`
    /// with `Job cancelled` once its worker observes the request.
    pub fn cancel(&self, job_id: Uuid) -> Result<bool> {
        let cancelled = self.store.cancel(job_id)?;
        debug!(%job_id, cancelled, "Job cancellation requested");
        Ok(cancelled)
    }

    pub fn stats(&self) -> QueueStats {
        self.store.stats()
    }

    pub fn queue_depth(&self) -> usize {
        self.queue.depth()
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::FilesystemBackend;
    use scribe_core::JobStatus;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        queue: Arc<JobQueue>,
        coordinator: JobCoordinator,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let queue = Arc::new(JobQueue::new());
        let coordinator = JobCoordinator::new(
            Arc::new(JobStore::new()),
            queue.clone(),
            Arc::new(FilesystemBackend::new(dir.path())),
        );
        Fixture {
            _dir: dir,
            queue,
            coordinator,
        }
    }

    #[tokio::test]
    async fn test_submit_creates_pending_job_and_enqueues() {
        let f = fixture();
        let id = f
            .coordinator
            .submit(Some("talk.wav"), b"RIFF....WAVE")
            .await
            .unwrap();

        let progress = f.coordinator.progress_of(id).unwrap();
        assert_eq!(progress.status, JobStatus::Pending);
        assert_eq!(progress.progress, 0);
        assert_eq!(f.coordinator.queue_depth(), 1);

        let entry = f.queue.dequeue().await.unwrap();
        assert_eq!(entry.job_id, id);
        assert!(entry.input_locator.ends_with("_talk.wav"));

        let job = f.coordinator.store().get(id).unwrap();
        assert_eq!(job.original_filename.as_deref(), Some("talk.wav"));
        assert_eq!(job.input_locator, entry.input_locator);
    }

    #[tokio::test]
    async fn test_submit_stores_upload() {
        let f = fixture();
        let id = f.coordinator.submit(None, b"payload").await.unwrap();
        let job = f.coordinator.store().get(id).unwrap();
        assert!(f.coordinator.inputs.exists(&job.input_locator).await.unwrap());
        assert_eq!(
            f.coordinator.inputs.read(&job.input_locator).await.unwrap(),
            b"payload"
        );
        assert!(job.original_filename.is_none());
    }

    #[tokio::test]
    async fn test_submit_empty_upload_creates_no_job() {
        let f = fixture();
        let err = f.coordinator.submit(Some("a.wav"), b"").await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(f.coordinator.stats().total, 0);
        assert_eq!(f.coordinator.queue_depth(), 0);
    }

    #[tokio::test]
    async fn test_submit_oversized_upload_rejected() {
        let f = fixture();
        let coordinator = f.coordinator.with_max_upload_bytes(4);
        let err = coordinator.submit(Some("a.wav"), b"12345").await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(coordinator.stats().total, 0);
    }

    #[tokio::test]
    async fn test_submit_after_queue_closed_fails_record() {
        let f = fixture();
        f.queue.close();
        let err = f.coordinator.submit(Some("a.wav"), b"data").await.unwrap_err();
        assert!(matches!(err, Error::Job(_)));

        let stats = f.coordinator.stats();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.pending, 0);
    }

    #[tokio::test]
    async fn test_progress_of_unknown_is_not_found() {
        let f = fixture();
        let err = f.coordinator.progress_of(Uuid::new_v4()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_cancel_pending_then_terminal() {
        let f = fixture();
        let id = f.coordinator.submit(Some("a.wav"), b"data").await.unwrap();
        assert!(f.coordinator.cancel(id).unwrap());
        assert!(f.coordinator.cancel(Uuid::new_v4()).unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_ids_are_unique_and_time_ordered() {
        let f = fixture();
        let mut ids = Vec::new();
        for _ in 0..20 {
            ids.push(f.coordinator.submit(Some("a.wav"), b"data").await.unwrap());
        }
        let mut sorted = ids.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), 20);
        assert!(ids.iter().all(|id| id.get_version_num() == 7));
    }
}
