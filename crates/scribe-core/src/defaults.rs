//! Centralized default constants for scribe.
//!
//! **This module is the single source of truth** for shared default values.
//! Configuration structs in the other crates read their fallbacks from here.

// =============================================================================
// WORKER POOL
// =============================================================================

/// Default number of concurrent worker slots.
pub const JOB_WORKER_COUNT: usize = 5;

/// Default job execution timeout in seconds (5 minutes). Zero disables it.
pub const JOB_TIMEOUT_SECS: u64 = 300;

/// Capacity of the worker event broadcast channel.
pub const EVENT_BUS_CAPACITY: usize = 256;

/// Highest progress a running job may report; 100 is reserved for completion.
pub const PROGRESS_RUNNING_MAX: i32 = 99;

/// Progress value of a completed job.
pub const PROGRESS_COMPLETE: i32 = 100;

// =============================================================================
// STORAGE
// =============================================================================

/// Default directory for uploaded input artifacts.
pub const UPLOAD_DIR: &str = "./data/uploads";

/// Default directory for produced transcripts.
pub const OUTPUT_DIR: &str = "./data/transcriptions";

/// File extension of stored results.
pub const RESULT_EXTENSION: &str = "txt";

/// Filename used when an upload arrives without one.
pub const UNNAMED_UPLOAD: &str = "upload.bin";

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;

/// Default bind host.
pub const SERVER_HOST: &str = "0.0.0.0";

/// Default maximum upload size (100 MiB).
pub const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

// =============================================================================
// TRANSCRIPTION
// =============================================================================

/// Environment variable for the Whisper transcription server URL.
pub const ENV_WHISPER_BASE_URL: &str = "WHISPER_BASE_URL";

/// Default Whisper transcription server URL.
pub const DEFAULT_WHISPER_BASE_URL: &str = "http://localhost:8000";

/// Environment variable for the Whisper model name.
pub const ENV_WHISPER_MODEL: &str = "WHISPER_MODEL";

/// Default Whisper model.
pub const DEFAULT_WHISPER_MODEL: &str = "Systran/faster-distil-whisper-large-v3";

/// Environment variable for an optional ISO 639-1 language hint.
pub const ENV_WHISPER_LANGUAGE: &str = "WHISPER_LANGUAGE";

/// Timeout for a single transcription request in seconds.
pub const WHISPER_TIMEOUT_SECS: u64 = 300;
