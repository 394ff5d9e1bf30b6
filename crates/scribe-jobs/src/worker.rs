//! Bounded worker pool that drains the job queue.
//!
//! The pool runs `worker_count` long-lived slots. Each slot pulls one entry
//! at a time from the shared [`JobQueue`], so at most `worker_count` jobs are
//! ever `in_progress`. A slot is the only writer of the record it is
//! processing; every outcome of the engine (success, error, panic, timeout,
//! cancellation) ends in exactly one terminal transition and the slot moves
//! on to the next entry.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use scribe_core::{defaults, Error, Job, Result};

use crate::handler::{JobContext, ProcessingEngine};
use crate::queue::{JobQueue, QueueEntry};
use crate::results::result_locator;
use crate::storage::StorageBackend;
use crate::store::JobStore;

/// Configuration for the worker pool.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Number of concurrent worker slots.
    pub worker_count: usize,
    /// Per-job timeout in seconds. Zero disables the timeout.
    pub job_timeout_secs: u64,
    /// Whether to start any workers at all.
    pub enabled: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_count: defaults::JOB_WORKER_COUNT,
            job_timeout_secs: defaults::JOB_TIMEOUT_SECS,
            enabled: true,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `JOB_WORKER_ENABLED` | `true` | Enable/disable job processing |
    /// | `JOB_WORKER_COUNT` | `5` | Number of worker slots (min 1) |
    /// | `JOB_TIMEOUT_SECS` | `300` | Per-job timeout, `0` disables |
    pub fn from_env() -> Self {
        let enabled = std::env::var("JOB_WORKER_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let worker_count = std::env::var("JOB_WORKER_COUNT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults::JOB_WORKER_COUNT)
            .max(1);

        let job_timeout_secs = std::env::var("JOB_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::JOB_TIMEOUT_SECS);

        Self {
            worker_count,
            job_timeout_secs,
            enabled,
        }
    }

    /// Set the number of worker slots (at least one).
    pub fn with_worker_count(mut self, count: usize) -> Self {
        self.worker_count = count.max(1);
        self
    }

    pub fn with_job_timeout_secs(mut self, secs: u64) -> Self {
        self.job_timeout_secs = secs;
        self
    }

    /// Enable or disable job processing.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Event emitted by the worker pool.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    /// A job moved to `in_progress`.
    JobStarted { job_id: Uuid, worker_id: usize },
    /// Job progress was updated.
    JobProgress {
        job_id: Uuid,
        percent: i32,
        message: Option<String>,
    },
    /// A job completed successfully.
    JobCompleted { job_id: Uuid, result_locator: String },
    /// A job failed.
    JobFailed { job_id: Uuid, error: String },
    /// A worker slot started.
    WorkerStarted { worker_id: usize },
    /// A worker slot stopped.
    WorkerStopped { worker_id: usize },
}

/// State shared by every slot of one pool.
struct PoolShared {
    store: Arc<JobStore>,
    queue: Arc<JobQueue>,
    engine: Arc<dyn ProcessingEngine>,
    inputs: Arc<dyn StorageBackend>,
    outputs: Arc<dyn StorageBackend>,
    event_tx: broadcast::Sender<WorkerEvent>,
    shutdown: CancellationToken,
    active: AtomicUsize,
    job_timeout_secs: u64,
}

/// Handle for controlling a running pool.
pub struct WorkerHandle {
    shared: Arc<PoolShared>,
    tasks: Mutex<JoinSet<()>>,
    worker_count: usize,
}

impl WorkerHandle {
    /// Shut the pool down.
    ///
    /// Closes the queue, cancels in-flight jobs (they fail with
    /// `Job cancelled`), waits for every slot to exit, and fails any entry
    /// that never reached a worker.
    pub async fn shutdown(&self) -> Result<()> {
        info!(workers = self.worker_count, "Shutting down worker pool");
        self.shared.queue.close();
        self.shared.shutdown.cancel();

        let mut tasks = self.tasks.lock().await;
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                error!(error = ?e, "Worker slot panicked");
            }
        }

        while let Some(entry) = self.shared.queue.dequeue().await {
            self.shared
                .finish_failed(entry.job_id, "Worker pool shut down".to_string(), None);
        }

        info!("Worker pool stopped");
        Ok(())
    }

    /// Get a receiver for pool events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.shared.event_tx.subscribe()
    }

    /// Number of jobs currently being processed.
    pub fn active_jobs(&self) -> usize {
        self.shared.active.load(Ordering::SeqCst)
    }

    /// Number of worker slots started.
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn engine(&self) -> &Arc<dyn ProcessingEngine> {
        &self.shared.engine
    }
}

/// Pool of worker slots, not yet started.
pub struct WorkerPool {
    shared: Arc<PoolShared>,
    config: WorkerConfig,
}

impl WorkerPool {
    /// Get a receiver for pool events.
    ///
    /// Subscribing before [`WorkerPool::start`] also observes the
    /// `WorkerStarted` events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.shared.event_tx.subscribe()
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Spawn the worker slots and return a handle for control.
    pub fn start(self) -> WorkerHandle {
        let mut tasks = JoinSet::new();
        let worker_count = if self.config.enabled {
            self.config.worker_count.max(1)
        } else {
            info!("Worker pool is disabled, not starting");
            0
        };

        for worker_id in 0..worker_count {
            let shared = self.shared.clone();
            tasks.spawn(async move { shared.run(worker_id).await });
        }

        if worker_count > 0 {
            info!(
                workers = worker_count,
                job_timeout_secs = self.config.job_timeout_secs,
                engine = self.shared.engine.name(),
                "Worker pool started"
            );
        }

        WorkerHandle {
            shared: self.shared,
            tasks: Mutex::new(tasks),
            worker_count,
        }
    }
}

impl PoolShared {
    /// Slot loop: take one entry, process it to a terminal state, repeat.
    #[instrument(skip(self))]
    async fn run(self: Arc<Self>, worker_id: usize) {
        debug!("Worker slot started");
        let _ = self.event_tx.send(WorkerEvent::WorkerStarted { worker_id });

        loop {
            let entry = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                entry = self.queue.dequeue() => match entry {
                    Some(entry) => entry,
                    None => break,
                },
            };
            self.execute(worker_id, entry).await;
        }

        let _ = self.event_tx.send(WorkerEvent::WorkerStopped { worker_id });
        debug!("Worker slot stopped");
    }

    async fn execute(&self, worker_id: usize, entry: QueueEntry) {
        let job_id = entry.job_id;

        let cancel = match self.store.cancellation_token(job_id) {
            Ok(token) => token,
            Err(e) => {
                error!(%job_id, worker_id, error = %e, "Dequeued job has no record");
                return;
            }
        };

        if cancel.is_cancelled() {
            debug!(%job_id, worker_id, "Job cancelled before it started");
            self.finish_failed(job_id, Error::Cancelled.to_string(), None);
            return;
        }

        let job = match self.store.mark_in_progress(job_id) {
            Ok(job) => job,
            Err(e) => {
                error!(%job_id, worker_id, error = %e, "Failed to mark job as in progress");
                return;
            }
        };

        let start = Instant::now();
        self.active.fetch_add(1, Ordering::SeqCst);
        info!(%job_id, worker_id, locator = %entry.input_locator, "Processing job");
        let _ = self
            .event_tx
            .send(WorkerEvent::JobStarted { job_id, worker_id });

        let outcome = match self.run_engine(job, cancel).await {
            Ok(text) => self.store_result(job_id, &text).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(locator) => self.finish_completed(job_id, locator, start),
            Err(e) => self.finish_failed(job_id, e.to_string(), Some(start)),
        }

        self.active.fetch_sub(1, Ordering::SeqCst);
    }

    /// Run the engine in its own task so a panic, timeout, or cancellation
    /// cannot take the slot down with it.
    async fn run_engine(&self, job: Job, cancel: CancellationToken) -> Result<String> {
        let job_id = job.id;
        let store = self.store.clone();
        let event_tx = self.event_tx.clone();
        let ctx = JobContext::new(job, self.inputs.clone(), cancel.clone()).with_progress_callback(
            move |percent, message| match store.set_progress(job_id, percent, message) {
                Ok(progress) => {
                    debug!(%job_id, progress, "Job progress");
                    let _ = event_tx.send(WorkerEvent::JobProgress {
                        job_id,
                        percent: progress,
                        message: message.map(String::from),
                    });
                }
                Err(e) => error!(%job_id, error = %e, "Failed to record job progress"),
            },
        );

        let engine = self.engine.clone();
        let mut task = tokio::spawn(async move { engine.process(ctx).await });

        let timeout_secs = self.job_timeout_secs;
        tokio::select! {
            joined = &mut task => match joined {
                Ok(result) => result,
                Err(e) if e.is_panic() => {
                    error!(%job_id, "Processing engine panicked");
                    Err(Error::Processing("Processing engine panicked".to_string()))
                }
                Err(e) => Err(Error::Internal(format!("Processing task failed: {}", e))),
            },
            _ = cancel.cancelled() => {
                task.abort();
                Err(Error::Cancelled)
            }
            _ = self.shutdown.cancelled() => {
                cancel.cancel();
                task.abort();
                Err(Error::Cancelled)
            }
            _ = job_deadline(timeout_secs) => {
                warn!(%job_id, "Job exceeded timeout of {}s", timeout_secs);
                cancel.cancel();
                task.abort();
                Err(Error::Timeout(timeout_secs))
            }
        }
    }

    async fn store_result(&self, job_id: Uuid, text: &str) -> Result<String> {
        let locator = result_locator(job_id);
        if let Err(e) = self.outputs.write(&locator, text.as_bytes()).await {
            error!(%job_id, %locator, error = %e, "Failed to store job result");
            return Err(e);
        }
        Ok(locator)
    }

    fn finish_completed(&self, job_id: Uuid, locator: String, start: Instant) {
        match self.store.complete(job_id, locator.clone()) {
            Ok(_) => {
                info!(
                    %job_id,
                    %locator,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Job completed successfully"
                );
                let _ = self.event_tx.send(WorkerEvent::JobCompleted {
                    job_id,
                    result_locator: locator,
                });
            }
            Err(e) => error!(%job_id, error = %e, "Failed to mark job as completed"),
        }
    }

    fn finish_failed(&self, job_id: Uuid, error: String, start: Option<Instant>) {
        match self.store.fail(job_id, error) {
            Ok(job) => {
                let error = job.error_message.unwrap_or_default();
                warn!(
                    %job_id,
                    %error,
                    duration_ms = start.map(|s| s.elapsed().as_millis() as u64),
                    "Job failed"
                );
                let _ = self.event_tx.send(WorkerEvent::JobFailed { job_id, error });
            }
            Err(e) => error!(%job_id, error = %e, "Failed to mark job as failed"),
        }
    }
}

async fn job_deadline(timeout_secs: u64) {
    if timeout_secs == 0 {
        std::future::pending::<()>().await
    } else {
        tokio::time::sleep(Duration::from_secs(timeout_secs)).await
    }
}

/// Builder for a worker pool.
pub struct WorkerBuilder {
    store: Arc<JobStore>,
    queue: Arc<JobQueue>,
    config: WorkerConfig,
    engine: Option<Arc<dyn ProcessingEngine>>,
    inputs: Option<Arc<dyn StorageBackend>>,
    outputs: Option<Arc<dyn StorageBackend>>,
}

impl WorkerBuilder {
    pub fn new(store: Arc<JobStore>, queue: Arc<JobQueue>) -> Self {
        Self {
            store,
            queue,
            config: WorkerConfig::default(),
            engine: None,
            inputs: None,
            outputs: None,
        }
    }

    pub fn with_config(mut self, config: WorkerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_engine<E: ProcessingEngine + 'static>(mut self, engine: E) -> Self {
        self.engine = Some(Arc::new(engine));
        self
    }

    /// Storage the engine reads input artifacts from.
    pub fn with_input_storage(mut self, storage: Arc<dyn StorageBackend>) -> Self {
        self.inputs = Some(storage);
        self
    }

    /// Storage result artifacts are written to.
    pub fn with_output_storage(mut self, storage: Arc<dyn StorageBackend>) -> Self {
        self.outputs = Some(storage);
        self
    }

    pub fn build(self) -> Result<WorkerPool> {
        let engine = self
            .engine
            .ok_or_else(|| Error::Config("Worker pool requires a processing engine".into()))?;
        let inputs = self
            .inputs
            .ok_or_else(|| Error::Config("Worker pool requires input storage".into()))?;
        let outputs = self
            .outputs
            .ok_or_else(|| Error::Config("Worker pool requires output storage".into()))?;

        let (event_tx, _) = broadcast::channel(defaults::EVENT_BUS_CAPACITY);
        Ok(WorkerPool {
            shared: Arc::new(PoolShared {
                store: self.store,
                queue: self.queue,
                engine,
                inputs,
                outputs,
                event_tx,
                shutdown: CancellationToken::new(),
                active: AtomicUsize::new(0),
                job_timeout_secs: self.config.job_timeout_secs,
            }),
            config: self.config,
        })
    }
}
