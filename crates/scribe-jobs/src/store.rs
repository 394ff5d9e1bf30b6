//! In-memory job record store.
//!
//! One `JobStore` instance is shared (via `Arc`) by the coordinator, every
//! worker slot, and every reader. Reads take a short read lock and clone the
//! record, so pollers never wait on processing. State transitions are only
//! reachable from inside this crate: the worker executing a job is its sole
//! writer.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use scribe_core::{defaults, Error, Job, JobStatus, QueueStats, Result};

struct JobEntry {
    job: Job,
    cancel: CancellationToken,
}

/// Thread-safe table of job records keyed by job id.
#[derive(Default)]
pub struct JobStore {
    jobs: RwLock<HashMap<Uuid, JobEntry>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a new pending record and return its id.
    pub fn create(
        &self,
        input_locator: impl Into<String>,
        original_filename: Option<String>,
    ) -> Uuid {
        let job = Job::new(input_locator, original_filename);
        let id = job.id;
        self.write().insert(
            id,
            JobEntry {
                job,
                cancel: CancellationToken::new(),
            },
        );
        debug!(job_id = %id, "Job record created");
        id
    }

    /// Snapshot of a job record.
    pub fn get(&self, id: Uuid) -> Result<Job> {
        self.read()
            .get(&id)
            .map(|entry| entry.job.clone())
            .ok_or(Error::JobNotFound(id))
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.read().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Job counts by status.
    pub fn stats(&self) -> QueueStats {
        let jobs = self.read();
        let mut stats = QueueStats::default();
        for entry in jobs.values() {
            stats.record(entry.job.status);
        }
        stats
    }

    /// Request cancellation of a job.
    ///
    /// Returns `false` when the job already reached a terminal state. The
    /// record itself is left alone; the worker owning the job observes the
    /// token and records the failure.
    pub fn cancel(&self, id: Uuid) -> Result<bool> {
        let jobs = self.read();
        let entry = jobs.get(&id).ok_or(Error::JobNotFound(id))?;
        if entry.job.is_terminal() {
            return Ok(false);
        }
        entry.cancel.cancel();
        Ok(true)
    }

    pub(crate) fn cancellation_token(&self, id: Uuid) -> Result<CancellationToken> {
        self.read()
            .get(&id)
            .map(|entry| entry.cancel.clone())
            .ok_or(Error::JobNotFound(id))
    }

    /// Apply a mutation to one record under the write lock.
    ///
    /// The mutation sees the current record and may reject the change by
    /// returning an error, in which case the record is left untouched.
    pub(crate) fn update<F>(&self, id: Uuid, mutation: F) -> Result<Job>
    where
        F: FnOnce(&mut Job) -> Result<()>,
    {
        let mut jobs = self.write();
        let entry = jobs.get_mut(&id).ok_or(Error::JobNotFound(id))?;
        let mut next = entry.job.clone();
        mutation(&mut next)?;
        entry.job = next.clone();
        Ok(next)
    }

    /// `pending -> in_progress`.
    pub(crate) fn mark_in_progress(&self, id: Uuid) -> Result<Job> {
        self.update(id, |job| {
            transition(job, JobStatus::InProgress)?;
            job.started_at = Some(Utc::now());
            job.progress_percent = 0;
            Ok(())
        })
    }

    /// Record a progress report for a running job.
    ///
    /// Values are clamped to `0..=99` and never move backwards. Reports for
    /// a job that is not running are ignored. Returns the stored percentage.
    pub(crate) fn set_progress(&self, id: Uuid, percent: i32, message: Option<&str>) -> Result<i32> {
        let job = self.update(id, |job| {
            if job.status != JobStatus::InProgress {
                return Ok(());
            }
            let clamped = percent.clamp(0, defaults::PROGRESS_RUNNING_MAX);
            job.progress_percent = job.progress_percent.max(clamped);
            if let Some(message) = message {
                job.progress_message = Some(message.to_string());
            }
            Ok(())
        })?;
        Ok(job.progress_percent)
    }

    /// `in_progress -> completed`.
    pub(crate) fn complete(&self, id: Uuid, result_locator: impl Into<String>) -> Result<Job> {
        let result_locator = result_locator.into();
        self.update(id, move |job| {
            transition(job, JobStatus::Completed)?;
            job.progress_percent = defaults::PROGRESS_COMPLETE;
            job.progress_message = None;
            job.result_locator = Some(result_locator);
            job.error_message = None;
            job.completed_at = Some(Utc::now());
            Ok(())
        })
    }

    /// `pending | in_progress -> failed`.
    pub(crate) fn fail(&self, id: Uuid, error: impl Into<String>) -> Result<Job> {
        let mut error = error.into();
        if error.trim().is_empty() {
            error = "Job failed without an error message".to_string();
        }
        self.update(id, move |job| {
            transition(job, JobStatus::Failed)?;
            job.progress_message = None;
            job.result_locator = None;
            job.error_message = Some(error);
            job.completed_at = Some(Utc::now());
            Ok(())
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<Uuid, JobEntry>> {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Uuid, JobEntry>> {
        self.jobs.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn transition(job: &mut Job, next: JobStatus) -> Result<()> {
    if !job.status.can_transition_to(next) {
        return Err(Error::Job(format!(
            "Invalid transition for job {}: {} -> {}",
            job.id, job.status, next
        )));
    }
    job.status = next;
    Ok(())
}
