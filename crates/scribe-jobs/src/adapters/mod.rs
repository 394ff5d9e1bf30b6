//! Processing engines backed by external services.

pub mod audio_transcribe;

pub use audio_transcribe::TranscriptionEngine;
