use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use thiserror::Error;

/// Error types for speech synthesis
#[derive(Debug, Error)]
pub enum TTSError {
    /// Missing key or no voice could be resolved
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Text is empty")]
    EmptyText,

    /// Upstream answered with a non-success status
    #[error("Provider error ({status}): {message}")]
    ProviderError { status: u16, message: String },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timed out: {0}")]
    Timeout(String),
}

impl From<reqwest::Error> for TTSError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TTSError::Timeout(e.to_string())
        } else {
            TTSError::NetworkError(e.to_string())
        }
    }
}

/// Result type for speech synthesis
pub type TTSResult<T> = Result<T, TTSError>;

/// Lazy, forward-only audio chunk sequence
pub type AudioStream = BoxStream<'static, TTSResult<Bytes>>;

/// What to say and how.
#[derive(Debug, Clone, Default)]
pub struct SynthesisRequest {
    pub text: String,
    /// Response category used for voice selection
    pub response_type: Option<String>,
    /// Explicit voice, overrides the category voice
    pub voice_id: Option<String>,
    /// Provider output format, e.g. `mp3_44100_128`
    pub output_format: Option<String>,
}

impl SynthesisRequest {
    pub fn new(text: impl Into<String>, response_type: Option<String>) -> Self {
        Self {
            text: text.into(),
            response_type,
            ..Default::default()
        }
    }
}

/// Fully buffered synthesis output
#[derive(Debug, Clone)]
pub struct SynthesizedAudio {
    pub data: Bytes,
    pub media_type: &'static str,
}

/// Streaming synthesis output
pub struct SynthesisStream {
    pub media_type: &'static str,
    pub chunks: AudioStream,
}

impl std::fmt::Debug for SynthesisStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynthesisStream")
            .field("media_type", &self.media_type)
            .finish_non_exhaustive()
    }
}

/// Text-to-speech provider.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize the whole utterance into one buffer.
    async fn synthesize(&self, request: SynthesisRequest) -> TTSResult<SynthesizedAudio>;

    /// Open a lazy chunk stream.
    ///
    /// Configuration and input problems are reported here; the network request is
    /// only issued once the stream is first polled. A non-success upstream status
    /// surfaces as the first item of the stream.
    fn stream(&self, request: SynthesisRequest) -> TTSResult<SynthesisStream>;
}
