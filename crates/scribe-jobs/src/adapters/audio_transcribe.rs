//! Audio transcription engine, backed by a [`TranscriptionBackend`].

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use scribe_core::{defaults, detect_audio_type, Error, Result};
use scribe_inference::{TranscriptionBackend, WhisperBackend};

use crate::handler::{JobContext, ProcessingEngine};

/// Turns an uploaded audio file into its transcript text.
///
/// Reports 10% once the input is loaded and 90% once the transcript has
/// arrived; the remaining time is spent inside the backend.
pub struct TranscriptionEngine {
    backend: Arc<dyn TranscriptionBackend>,
    language: Option<String>,
}

impl TranscriptionEngine {
    pub fn new(backend: Arc<dyn TranscriptionBackend>) -> Self {
        Self {
            backend,
            language: None,
        }
    }

    /// Create from environment variables using [`WhisperBackend`].
    ///
    /// `WHISPER_LANGUAGE` sets an optional ISO 639-1 language hint.
    pub fn from_env() -> Self {
        let language = std::env::var(defaults::ENV_WHISPER_LANGUAGE)
            .ok()
            .filter(|v| !v.trim().is_empty());
        let engine = Self::new(Arc::new(WhisperBackend::from_env()));
        match language {
            Some(lang) => engine.with_language(lang),
            None => engine,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn model_name(&self) -> &str {
        self.backend.model_name()
    }
}

#[async_trait]
impl ProcessingEngine for TranscriptionEngine {
    fn name(&self) -> &str {
        "audio_transcribe"
    }

    async fn process(&self, ctx: JobContext) -> Result<String> {
        let data = ctx.read_input().await?;
        ctx.report_progress(10, Some("Input loaded"));

        let filename = ctx.original_filename().unwrap_or(ctx.input_locator());
        let mime_type = detect_audio_type(filename, &data, None);
        if !mime_type.starts_with("audio/") && !mime_type.starts_with("video/") {
            return Err(Error::Processing(format!(
                "Unsupported media type {} for {}",
                mime_type, filename
            )));
        }

        let transcription = tokio::select! {
            result = self.backend.transcribe(&data, &mime_type, self.language.as_deref()) => result?,
            _ = ctx.cancelled() => return Err(Error::Cancelled),
        };
        ctx.report_progress(90, Some("Transcript received"));

        debug!(
            job_id = %ctx.job.id,
            segments = transcription.segment_count,
            language = ?transcription.language,
            duration_secs = ?transcription.duration_secs,
            "Transcription finished"
        );

        Ok(transcription.text.trim().to_string())
    }

    async fn health_check(&self) -> Result<bool> {
        self.backend.health_check().await
    }
}
