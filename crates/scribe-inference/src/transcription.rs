//! Transcription backend trait and the OpenAI-compatible Whisper client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, warn};

use scribe_core::{audio_extension, defaults, Error, Result};

/// Transcript returned by a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub text: String,
    /// Detected language (ISO 639-1 code).
    pub language: Option<String>,
    pub duration_secs: Option<f64>,
    /// Number of timestamped segments the backend split the audio into.
    pub segment_count: usize,
}

/// Speech-to-text backend.
#[async_trait]
pub trait TranscriptionBackend: Send + Sync {
    /// Transcribe one audio artifact. `language` is an optional hint.
    async fn transcribe(
        &self,
        audio: &[u8],
        mime_type: &str,
        language: Option<&str>,
    ) -> Result<Transcript>;

    async fn health_check(&self) -> Result<bool>;

    fn model_name(&self) -> &str;
}

/// OpenAI-compatible Whisper backend (works with Speaches/faster-whisper-server).
pub struct WhisperBackend {
    base_url: String,
    model: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl WhisperBackend {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client: reqwest::Client::new(),
            timeout_secs: defaults::WHISPER_TIMEOUT_SECS,
        }
    }

    /// Create from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `WHISPER_BASE_URL` | `http://localhost:8000` |
    /// | `WHISPER_MODEL` | `Systran/faster-distil-whisper-large-v3` |
    pub fn from_env() -> Self {
        let base_url = env_or(
            defaults::ENV_WHISPER_BASE_URL,
            defaults::DEFAULT_WHISPER_BASE_URL,
        );
        let model = env_or(defaults::ENV_WHISPER_MODEL, defaults::DEFAULT_WHISPER_MODEL);
        Self::new(base_url, model)
    }

    /// Override the per-request timeout.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn form(&self, audio: &[u8], mime_type: &str, language: Option<&str>) -> Result<Form> {
        let file = Part::bytes(audio.to_vec())
            .file_name(format!("audio.{}", audio_extension(mime_type)))
            .mime_str(mime_type)
            .map_err(|e| Error::InvalidInput(format!("Unusable media type {}: {}", mime_type, e)))?;

        let form = Form::new()
            .part("file", file)
            .text("model", self.model.clone())
            .text("response_format", "verbose_json");

        Ok(match language {
            Some(lang) => form.text("language", lang.to_string()),
            None => form,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// `verbose_json` response body. Only the segment count is kept.
#[derive(Deserialize)]
struct VerboseJson {
    text: String,
    #[serde(default)]
    segments: Vec<serde::de::IgnoredAny>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
}

impl From<VerboseJson> for Transcript {
    fn from(body: VerboseJson) -> Self {
        Self {
            text: body.text,
            language: body.language,
            duration_secs: body.duration,
            segment_count: body.segments.len(),
        }
    }
}

#[async_trait]
impl TranscriptionBackend for WhisperBackend {
    async fn transcribe(
        &self,
        audio: &[u8],
        mime_type: &str,
        language: Option<&str>,
    ) -> Result<Transcript> {
        debug!(
            model = %self.model,
            size_bytes = audio.len(),
            mime_type,
            "Sending audio for transcription"
        );

        let response = self
            .client
            .post(format!("{}/v1/audio/transcriptions", self.base_url))
            .multipart(self.form(audio, mime_type, language)?)
            .timeout(Duration::from_secs(self.timeout_secs))
            .send()
            .await
            .map_err(|e| Error::Request(format!("Transcription request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "Whisper API rejected transcription request");
            return Err(Error::Processing(format!(
                "Whisper API returned {}: {}",
                status, body
            )));
        }

        let body: VerboseJson = response.json().await.map_err(|e| {
            Error::Serialization(format!("Failed to parse whisper response: {}", e))
        })?;
        Ok(body.into())
    }

    async fn health_check(&self) -> Result<bool> {
        let probe = self
            .client
            .get(format!("{}/health", self.base_url))
            .timeout(Duration::from_secs(5))
            .send()
            .await;
        Ok(probe.map(|r| r.status().is_success()).unwrap_or(false))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
