use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Error types for transcription operations
#[derive(Debug, Error)]
pub enum STTError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Empty or oversized audio
    #[error("Audio processing error: {0}")]
    AudioProcessingError(String),

    #[error("Provider returned an empty transcript")]
    EmptyTranscript,

    /// Upstream answered with a non-success status
    #[error("Provider error ({status}): {message}")]
    ProviderError { status: u16, message: String },

    /// Upstream answered 2xx with a body we cannot read
    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timed out: {0}")]
    Timeout(String),
}

impl From<reqwest::Error> for STTError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            STTError::Timeout(e.to_string())
        } else {
            STTError::NetworkError(e.to_string())
        }
    }
}

/// Result type for transcription operations
pub type STTResult<T> = Result<T, STTError>;

/// One utterance of canonical audio handed to a transcriber.
#[derive(Debug, Clone)]
pub struct AudioInput {
    pub data: Bytes,
    pub file_name: String,
    pub content_type: String,
    /// Language hint, passed through to the provider when present
    pub language: Option<String>,
}

impl AudioInput {
    /// Wrap canonical WAV bytes.
    pub fn wav(data: Bytes, language: Option<String>) -> Self {
        Self {
            data,
            file_name: "audio.wav".to_string(),
            content_type: "audio/wav".to_string(),
            language,
        }
    }
}

/// Batch speech-to-text over a complete utterance.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe the utterance into plain, non-empty text.
    async fn transcribe(&self, input: AudioInput) -> STTResult<String>;
}
