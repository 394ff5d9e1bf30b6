//! # scribe-jobs
//!
//! Background transcription jobs for scribe.
//!
//! This crate provides:
//! - An in-memory job record store with a validated status lifecycle
//! - A FIFO job queue shared by a bounded pool of worker slots
//! - Progress tracking and notifications via broadcast channels
//! - Cancellation and per-job timeouts
//! - Result access for completed jobs
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use scribe_jobs::{
//!     FilesystemBackend, JobCoordinator, JobQueue, JobStore, ResultAccess,
//!     StorageBackend, TranscriptionEngine, WorkerBuilder, WorkerConfig,
//! };
//!
//! let store = Arc::new(JobStore::new());
//! let queue = Arc::new(JobQueue::new());
//! let uploads: Arc<dyn StorageBackend> = Arc::new(FilesystemBackend::new("./data/uploads"));
//! let outputs: Arc<dyn StorageBackend> = Arc::new(FilesystemBackend::new("./data/transcriptions"));
//!
//! let handle = WorkerBuilder::new(store.clone(), queue.clone())
//!     .with_config(WorkerConfig::default().with_worker_count(5))
//!     .with_engine(TranscriptionEngine::from_env())
//!     .with_input_storage(uploads.clone())
//!     .with_output_storage(outputs.clone())
//!     .build()?
//!     .start();
//!
//! let coordinator = JobCoordinator::new(store.clone(), queue, uploads);
//! let job_id = coordinator.submit(Some("talk.wav"), &audio).await?;
//!
//! // Poll until the job is terminal, then fetch the transcript
//! let progress = coordinator.progress_of(job_id)?;
//! if let Some(locator) = progress.download_locator {
//!     let output = ResultAccess::new(store, outputs).fetch(&locator).await?;
//! }
//!
//! // Graceful shutdown
//! handle.shutdown().await?;
//! ```

pub mod adapters;
pub mod coordinator;
pub mod handler;
pub mod queue;
pub mod results;
pub mod storage;
pub mod store;
pub mod worker;

// Re-export core types
pub use scribe_core::*;

pub use adapters::TranscriptionEngine;
pub use coordinator::JobCoordinator;
pub use handler::{JobContext, PassthroughEngine, ProcessingEngine, ProgressCallback};
pub use queue::{JobQueue, QueueEntry};
pub use results::{result_locator, ResultAccess};
pub use storage::{upload_locator, FilesystemBackend, StorageBackend, StorageConfig};
pub use store::JobStore;
pub use worker::{WorkerBuilder, WorkerConfig, WorkerEvent, WorkerHandle, WorkerPool};
