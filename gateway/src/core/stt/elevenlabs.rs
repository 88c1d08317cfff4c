//! ElevenLabs speech-to-text over the batch REST API.
//!
//! - Endpoint: `POST https://api.elevenlabs.io/v1/speech-to-text`
//! - Body: multipart with `file`, `model_id` and optional `language_code`
//! - Auth: `xi-api-key` header

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, info, warn};
use zeroize::Zeroize;

use super::base::{AudioInput, STTError, STTResult, Transcriber};

/// Default ElevenLabs speech-to-text endpoint
pub const ELEVENLABS_STT_URL: &str = "https://api.elevenlabs.io/v1/speech-to-text";

/// Default transcription model
pub const DEFAULT_STT_MODEL: &str = "scribe_v2";

/// Upstream error bodies are cut to this many characters
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Configuration for [`ElevenLabsSTT`]
#[derive(Clone)]
pub struct ElevenLabsSTTConfig {
    pub api_key: String,
    pub url: String,
    pub model_id: String,
    /// Largest utterance accepted, in bytes
    pub max_audio_bytes: usize,
}

impl std::fmt::Debug for ElevenLabsSTTConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElevenLabsSTTConfig")
            .field("api_key", &"<redacted>")
            .field("url", &self.url)
            .field("model_id", &self.model_id)
            .field("max_audio_bytes", &self.max_audio_bytes)
            .finish()
    }
}

impl Drop for ElevenLabsSTTConfig {
    fn drop(&mut self) {
        self.api_key.zeroize();
    }
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: Option<String>,
}

/// Transcriber backed by the ElevenLabs REST API.
pub struct ElevenLabsSTT {
    config: ElevenLabsSTTConfig,
    http_client: reqwest::Client,
}

impl ElevenLabsSTT {
    /// Create a transcriber sharing the process-wide HTTP client.
    pub fn new(config: ElevenLabsSTTConfig, http_client: reqwest::Client) -> Self {
        Self {
            config,
            http_client,
        }
    }

    fn build_form(&self, input: AudioInput) -> STTResult<Form> {
        let file_part = Part::bytes(input.data.to_vec())
            .file_name(input.file_name)
            .mime_str(&input.content_type)
            .map_err(|e| STTError::ConfigurationError(format!("Invalid MIME type: {e}")))?;

        let mut form = Form::new()
            .part("file", file_part)
            .text("model_id", self.config.model_id.clone());

        if let Some(language) = input.language.filter(|l| !l.trim().is_empty()) {
            form = form.text("language_code", language);
        }
        Ok(form)
    }
}

#[async_trait]
impl Transcriber for ElevenLabsSTT {
    async fn transcribe(&self, input: AudioInput) -> STTResult<String> {
        if self.config.api_key.is_empty() {
            return Err(STTError::ConfigurationError(
                "XI_API_KEY is not configured".to_string(),
            ));
        }
        if input.data.is_empty() {
            return Err(STTError::AudioProcessingError("Empty audio".to_string()));
        }
        if input.data.len() > self.config.max_audio_bytes {
            return Err(STTError::AudioProcessingError(format!(
                "Audio ({} bytes) exceeds maximum size ({} bytes)",
                input.data.len(),
                self.config.max_audio_bytes
            )));
        }

        let audio_bytes = input.data.len();
        info!(audio_bytes, "Sending audio to ElevenLabs STT");

        let form = self.build_form(input)?;
        let response = self
            .http_client
            .post(&self.config.url)
            .header("xi-api-key", &self.config.api_key)
            .header("accept", "application/json")
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "ElevenLabs STT returned an error");
            return Err(STTError::ProviderError {
                status: status.as_u16(),
                message: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let parsed: TranscriptionResponse = serde_json::from_str(&body)
            .map_err(|e| STTError::InvalidResponse(format!("Failed to parse response: {e}")))?;

        let transcript = parsed.text.unwrap_or_default().trim().to_string();
        if transcript.is_empty() {
            return Err(STTError::EmptyTranscript);
        }

        debug!(%transcript, "Transcription received");
        info!(chars = transcript.chars().count(), "Transcription complete");
        Ok(transcript)
    }
}
