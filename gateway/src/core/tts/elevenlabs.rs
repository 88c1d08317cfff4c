//! ElevenLabs text-to-speech over the HTTP streaming endpoint.
//!
//! - Endpoint: `POST {template(voice_id)}/stream?output_format=<fmt>`
//! - Body: `{"text": ..., "model_id": ...}`
//! - Auth: `xi-api-key` header

use async_stream::try_stream;
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::json;
use tracing::{debug, info, warn};
use zeroize::Zeroize;

use super::base::{
    AudioStream, SpeechSynthesizer, SynthesisRequest, SynthesisStream, SynthesizedAudio, TTSError,
    TTSResult,
};
use super::voices::{VoiceTable, media_type_for_format};

/// Default ElevenLabs endpoint template; `{voice_id}` is substituted per request
pub const ELEVENLABS_TTS_URL_TEMPLATE: &str = "https://api.elevenlabs.io/v1/text-to-speech/{voice_id}";

/// Default synthesis model
pub const DEFAULT_TTS_MODEL: &str = "eleven_multilingual_v2";

/// Default output format
pub const DEFAULT_OUTPUT_FORMAT: &str = "mp3_44100_128";

const VOICE_PLACEHOLDER: &str = "{voice_id}";

/// Upstream error bodies are cut to this many characters
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Configuration for [`ElevenLabsTTS`]
#[derive(Clone)]
pub struct ElevenLabsTTSConfig {
    pub api_key: String,
    pub url_template: String,
    pub model_id: String,
    pub default_format: String,
    pub voices: VoiceTable,
}

impl std::fmt::Debug for ElevenLabsTTSConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElevenLabsTTSConfig")
            .field("api_key", &"<redacted>")
            .field("url_template", &self.url_template)
            .field("model_id", &self.model_id)
            .field("default_format", &self.default_format)
            .field("voices", &self.voices)
            .finish()
    }
}

impl Drop for ElevenLabsTTSConfig {
    fn drop(&mut self) {
        self.api_key.zeroize();
    }
}

/// Validated, ready-to-send request parameters
struct PreparedRequest {
    url: String,
    format: String,
    voice_id: String,
    text: String,
}

/// Synthesizer backed by the ElevenLabs REST API.
pub struct ElevenLabsTTS {
    config: ElevenLabsTTSConfig,
    http_client: reqwest::Client,
}

impl ElevenLabsTTS {
    /// Create a synthesizer sharing the process-wide HTTP client.
    pub fn new(config: ElevenLabsTTSConfig, http_client: reqwest::Client) -> Self {
        Self {
            config,
            http_client,
        }
    }

    fn prepare(&self, request: SynthesisRequest) -> TTSResult<PreparedRequest> {
        if self.config.api_key.is_empty() {
            return Err(TTSError::InvalidConfiguration(
                "XI_API_KEY is not configured".to_string(),
            ));
        }
        if request.text.trim().is_empty() {
            return Err(TTSError::EmptyText);
        }

        let voice_id = self
            .config
            .voices
            .resolve(request.voice_id.as_deref(), request.response_type.as_deref())
            .ok_or_else(|| {
                TTSError::InvalidConfiguration(
                    "No voice available (DEFAULT_VOICE_ID not set)".to_string(),
                )
            })?;

        let format = request
            .output_format
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .unwrap_or(&self.config.default_format)
            .to_string();

        let base = self.config.url_template.replace(VOICE_PLACEHOLDER, &voice_id);
        Ok(PreparedRequest {
            url: format!("{}/stream", base.trim_end_matches('/')),
            format,
            voice_id,
            text: request.text,
        })
    }

    fn build_http_request(&self, prepared: &PreparedRequest) -> reqwest::RequestBuilder {
        self.http_client
            .post(&prepared.url)
            .query(&[("output_format", prepared.format.as_str())])
            .header("xi-api-key", &self.config.api_key)
            .header("accept", "*/*")
            .json(&json!({
                "text": prepared.text,
                "model_id": self.config.model_id,
            }))
    }
}

async fn provider_error(response: reqwest::Response) -> TTSError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    warn!(status, "ElevenLabs TTS returned an error");
    TTSError::ProviderError {
        status,
        message: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsTTS {
    async fn synthesize(&self, request: SynthesisRequest) -> TTSResult<SynthesizedAudio> {
        let prepared = self.prepare(request)?;
        debug!(voice_id = %prepared.voice_id, format = %prepared.format, "Synthesizing speech");

        let response = self.build_http_request(&prepared).send().await?;
        if !response.status().is_success() {
            return Err(provider_error(response).await);
        }

        let data = response.bytes().await?;
        info!(
            text_chars = prepared.text.chars().count(),
            audio_bytes = data.len(),
            "Speech synthesized"
        );
        Ok(SynthesizedAudio {
            data,
            media_type: media_type_for_format(&prepared.format),
        })
    }

    fn stream(&self, request: SynthesisRequest) -> TTSResult<SynthesisStream> {
        let prepared = self.prepare(request)?;
        let media_type = media_type_for_format(&prepared.format);
        let http_request = self.build_http_request(&prepared);
        let voice_id = prepared.voice_id;

        let chunks: AudioStream = Box::pin(try_stream! {
            debug!(%voice_id, "Opening speech stream");
            let response = http_request.send().await?;
            let response = if response.status().is_success() {
                response
            } else {
                Err(provider_error(response).await)?
            };

            let mut body = response.bytes_stream();
            while let Some(chunk) = body.next().await {
                yield chunk?;
            }
        });

        Ok(SynthesisStream { media_type, chunks })
    }
}
