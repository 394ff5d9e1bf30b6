//! Read access to completed job results.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use scribe_core::{defaults, Error, JobOutput, JobStatus, Result};

use crate::storage::StorageBackend;
use crate::store::JobStore;

/// Locator under which a job's result artifact is stored: `{job_id}.txt`.
pub fn result_locator(job_id: Uuid) -> String {
    format!("{}.{}", job_id, defaults::RESULT_EXTENSION)
}

/// Serves result artifacts, but only for jobs that completed.
pub struct ResultAccess {
    store: Arc<JobStore>,
    outputs: Arc<dyn StorageBackend>,
}

impl ResultAccess {
    pub fn new(store: Arc<JobStore>, outputs: Arc<dyn StorageBackend>) -> Self {
        Self { store, outputs }
    }

    /// Fetch the result published under `locator`.
    ///
    /// Unknown locators, jobs that have not completed, and missing artifacts
    /// all yield [`Error::NotFound`]. A partially written result is never
    /// returned because the record only carries a locator once the artifact
    /// has been fully stored.
    pub async fn fetch(&self, locator: &str) -> Result<JobOutput> {
        let not_found = || Error::NotFound(format!("Result {} not found", locator));

        let job_id = locator
            .strip_suffix(&format!(".{}", defaults::RESULT_EXTENSION))
            .and_then(|id| Uuid::parse_str(id).ok())
            .ok_or_else(not_found)?;

        let job = match self.store.get(job_id) {
            Ok(job) => job,
            Err(Error::JobNotFound(_)) => return Err(not_found()),
            Err(e) => return Err(e),
        };

        if job.status != JobStatus::Completed || job.result_locator.as_deref() != Some(locator) {
            debug!(%job_id, status = %job.status, "Result requested before completion");
            return Err(not_found());
        }

        let data = match self.outputs.read(locator).await {
            Ok(data) => data,
            Err(e) if e.is_not_found() => return Err(not_found()),
            Err(e) => return Err(e),
        };
        let content = String::from_utf8(data)
            .map_err(|e| Error::Storage(format!("Result {} is not valid UTF-8: {}", locator, e)))?;

        Ok(JobOutput {
            filename: download_filename(job.original_filename.as_deref(), locator),
            content,
        })
    }
}

/// `talk.wav` becomes `talk.txt`; unnamed uploads keep the locator.
fn download_filename(original: Option<&str>, locator: &str) -> String {
    original
        .and_then(|name| Path::new(name).file_stem())
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .map(|stem| format!("{}.{}", stem, defaults::RESULT_EXTENSION))
        .unwrap_or_else(|| locator.to_string())
}
