//! Job data model shared by the job engine and the HTTP surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::defaults;

// =============================================================================
// JOB TYPES
// =============================================================================

/// Status of a job.
///
/// `Completed` and `Failed` are terminal: a job in either state never changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl JobStatus {
    /// Whether no further transitions can happen.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Whether `self -> next` is an edge of the job state machine.
    ///
    /// ```text
    /// pending -> in_progress -> completed
    ///    |             |
    ///    +-------------+-----> failed
    /// ```
    ///
    /// `pending -> failed` only happens when a job is cancelled before a
    /// worker starts it, or when it could not be enqueued.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::InProgress)
                | (JobStatus::Pending, JobStatus::Failed)
                | (JobStatus::InProgress, JobStatus::Completed)
                | (JobStatus::InProgress, JobStatus::Failed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::InProgress => "in_progress",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A submitted unit of work tracked from pending to a terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub status: JobStatus,
    /// 0 while pending, non-decreasing while running, 100 once completed.
    pub progress_percent: i32,
    pub progress_message: Option<String>,
    /// Storage locator of the uploaded artifact.
    pub input_locator: String,
    /// Client-supplied filename of the artifact, if any.
    pub original_filename: Option<String>,
    /// Set only when completed.
    pub result_locator: Option<String>,
    /// Set only when failed.
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a fresh pending job for a stored artifact.
    pub fn new(input_locator: impl Into<String>, original_filename: Option<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            status: JobStatus::Pending,
            progress_percent: 0,
            progress_message: None,
            input_locator: input_locator.into(),
            original_filename,
            result_locator: None,
            error_message: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Wall-clock processing time, once the job has finished.
    pub fn duration_ms(&self) -> Option<i64> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds()),
            _ => None,
        }
    }
}

/// Poll response for a single job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct JobProgress {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub progress: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Locator to pass to the result endpoint; present only when completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_locator: Option<String>,
    /// Failure detail; present only when failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&Job> for JobProgress {
    fn from(job: &Job) -> Self {
        let completed = job.status == JobStatus::Completed;
        Self {
            job_id: job.id,
            status: job.status,
            progress: if completed {
                defaults::PROGRESS_COMPLETE
            } else {
                job.progress_percent
            },
            message: job.progress_message.clone(),
            download_locator: if completed {
                job.result_locator.clone()
            } else {
                None
            },
            error: if job.status == JobStatus::Failed {
                job.error_message.clone()
            } else {
                None
            },
        }
    }
}

/// Content of a completed job's result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct JobOutput {
    pub filename: String,
    pub content: String,
}

/// Job counts by status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct QueueStats {
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub failed: usize,
    pub total: usize,
}

impl QueueStats {
    /// Tally one job.
    pub fn record(&mut self, status: JobStatus) {
        match status {
            JobStatus::Pending => self.pending += 1,
            JobStatus::InProgress => self.in_progress += 1,
            JobStatus::Completed => self.completed += 1,
            JobStatus::Failed => self.failed += 1,
        }
        self.total += 1;
    }
}
