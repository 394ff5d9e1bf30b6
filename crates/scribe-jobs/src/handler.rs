//! Processing engine trait and the per-job execution context.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use scribe_core::{Job, Result};

use crate::storage::StorageBackend;

/// Progress callback type for processing engines.
pub type ProgressCallback = Box<dyn Fn(i32, Option<&str>) + Send + Sync>;

/// Context provided to a processing engine for one job.
pub struct JobContext {
    /// Snapshot of the job taken when it moved to `in_progress`.
    pub job: Job,
    input: Arc<dyn StorageBackend>,
    cancel: CancellationToken,
    progress_callback: Option<ProgressCallback>,
}

impl JobContext {
    pub fn new(job: Job, input: Arc<dyn StorageBackend>, cancel: CancellationToken) -> Self {
        Self {
            job,
            input,
            cancel,
            progress_callback: None,
        }
    }

    /// Set the progress callback.
    pub fn with_progress_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(i32, Option<&str>) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Box::new(callback));
        self
    }

    /// Report progress to the callback.
    ///
    /// Reports are advisory: the store keeps progress monotonic and below
    /// 100 until the job completes.
    pub fn report_progress(&self, percent: i32, message: Option<&str>) {
        if let Some(ref callback) = self.progress_callback {
            callback(percent, message);
        }
    }

    /// Load the input artifact.
    pub async fn read_input(&self) -> Result<Vec<u8>> {
        self.input.read(&self.job.input_locator).await
    }

    pub fn input_locator(&self) -> &str {
        &self.job.input_locator
    }

    pub fn original_filename(&self) -> Option<&str> {
        self.job.original_filename.as_deref()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once the job has been cancelled.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }
}

/// Turns one input artifact into result text.
#[async_trait]
pub trait ProcessingEngine: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Process the job's input artifact and return the result text.
    ///
    /// An `Err` fails the job; its message becomes the job's error detail.
    async fn process(&self, ctx: JobContext) -> Result<String>;

    /// Check whether the engine's dependencies are reachable.
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}

/// Engine that returns the input artifact as UTF-8 text.
pub struct PassthroughEngine;

#[async_trait]
impl ProcessingEngine for PassthroughEngine {
    fn name(&self) -> &str {
        "passthrough"
    }

    async fn process(&self, ctx: JobContext) -> Result<String> {
        let data = ctx.read_input().await?;
        ctx.report_progress(50, Some("Input loaded"));
        String::from_utf8(data).map_err(|e| {
            scribe_core::Error::Processing(format!("Input is not valid UTF-8: {}", e))
        })
    }
}
