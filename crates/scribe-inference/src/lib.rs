//! # scribe-inference
//!
//! Speech-to-text backends for scribe.
//!
//! This crate provides:
//! - The pluggable [`TranscriptionBackend`] trait
//! - [`WhisperBackend`], an OpenAI-compatible Whisper client (works with
//!   Speaches / faster-whisper-server and the hosted OpenAI API)
//!
//! # Example
//!
//! ```rust,no_run
//! use scribe_inference::{TranscriptionBackend, WhisperBackend};
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = WhisperBackend::from_env();
//!     let audio = std::fs::read("talk.wav").unwrap();
//!     let transcript = backend.transcribe(&audio, "audio/wav", None).await.unwrap();
//!     println!("{}", transcript.text);
//! }
//! ```

pub mod transcription;

pub use transcription::{Transcript, TranscriptionBackend, WhisperBackend};
