//! # scribe-core
//!
//! Core types, errors, and defaults for the scribe transcription job service.
//!
//! This crate provides the job data model and error type that the job engine
//! (`scribe-jobs`), the transcription backends (`scribe-inference`), and the
//! HTTP surface (`scribe-api`) share.

pub mod defaults;
pub mod error;
pub mod file_safety;
pub mod models;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use file_safety::{audio_extension, detect_audio_type, sanitize_filename, validate_upload};
pub use models::*;
