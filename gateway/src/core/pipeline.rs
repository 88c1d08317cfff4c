//! The adapter chain shared by realtime sessions and the synchronous endpoints.

use std::sync::Arc;

use bytes::Bytes;
use serde_json::{Map, Value};

use crate::config::ServerConfig;
use crate::core::orchestration::{
    NormalizedResponse, Orchestrator, OrchestratorResult, WebhookOrchestrator, apply_fallback,
    is_crisis,
};
use crate::core::stt::{AudioInput, ElevenLabsSTT, STTResult, Transcriber};
use crate::core::text::sanitize;
use crate::core::transcode::{FfmpegTranscoder, TranscodeResult, Transcoder};
use crate::core::tts::{ElevenLabsTTS, SpeechSynthesizer};

/// Session identifier used when the client supplies none
pub const DEFAULT_SESSION_ID: &str = "session";

/// Audio content type assumed when the client declares none
pub const DEFAULT_INPUT_MIME: &str = "audio/webm";

/// How an orchestration response is delivered to the user.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyPlan {
    /// Nothing speakable came back
    NoText,
    /// Show the text directly, bypassing synthesis
    Crisis {
        text: String,
        meta: Option<Map<String, Value>>,
    },
    /// Synthesize the sanitized text
    Speak {
        text: String,
        response_type: Option<String>,
    },
}

/// Decide how a resolved response reaches the user.
///
/// Expects the safety fallback to have been applied already.
pub fn plan_reply(response: &NormalizedResponse) -> ReplyPlan {
    let result = &response.result;
    let Some(text) = result.text() else {
        return ReplyPlan::NoText;
    };

    if is_crisis(result) {
        return ReplyPlan::Crisis {
            text: text.to_string(),
            meta: result.meta.clone(),
        };
    }

    let spoken = sanitize(text);
    if spoken.is_empty() {
        return ReplyPlan::NoText;
    }
    ReplyPlan::Speak {
        text: spoken,
        response_type: result.response_type.clone(),
    }
}

/// Transcoder, transcriber, orchestrator and synthesizer behind trait objects.
#[derive(Clone)]
pub struct VoicePipeline {
    pub transcoder: Arc<dyn Transcoder>,
    pub transcriber: Arc<dyn Transcriber>,
    pub orchestrator: Arc<dyn Orchestrator>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
}

impl VoicePipeline {
    pub fn new(
        transcoder: Arc<dyn Transcoder>,
        transcriber: Arc<dyn Transcriber>,
        orchestrator: Arc<dyn Orchestrator>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        Self {
            transcoder,
            transcriber,
            orchestrator,
            synthesizer,
        }
    }

    /// Build the production adapters from configuration and the shared HTTP client.
    pub fn from_config(config: &ServerConfig, http_client: reqwest::Client) -> Self {
        Self::new(
            Arc::new(FfmpegTranscoder::from_config(config.ffmpeg_path.as_deref())),
            Arc::new(ElevenLabsSTT::new(config.stt_config(), http_client.clone())),
            Arc::new(WebhookOrchestrator::new(
                config.webhook_config(),
                http_client.clone(),
            )),
            Arc::new(ElevenLabsTTS::new(config.tts_config(), http_client)),
        )
    }

    /// Normalize audio into canonical WAV.
    pub async fn to_canonical(&self, audio: Bytes, declared_mime: Option<&str>) -> TranscodeResult<Bytes> {
        self.transcoder.to_wav(audio, declared_mime).await
    }

    /// Transcribe canonical WAV audio.
    pub async fn transcribe(&self, wav: Bytes, language: Option<String>) -> STTResult<String> {
        self.transcriber.transcribe(AudioInput::wav(wav, language)).await
    }

    /// Forward a transcript and resolve crisis responses that came back without text.
    pub async fn converse(
        &self,
        session_id: &str,
        transcript: &str,
    ) -> OrchestratorResult<NormalizedResponse> {
        let mut response = self.orchestrator.forward(session_id, transcript).await?;
        apply_fallback(&mut response);
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::orchestration::{HARD_BLOCK_CRISIS_MESSAGE, normalize_body};
    use serde_json::json;

    fn plan(body: Value) -> ReplyPlan {
        let mut response = normalize_body(&body.to_string());
        apply_fallback(&mut response);
        plan_reply(&response)
    }

    #[test]
    fn test_plan_speak_sanitizes() {
        assert_eq!(
            plan(json!({"type": "neutral", "text": "Hai! **Apa kabar**"})),
            ReplyPlan::Speak {
                text: "Hai! Apa kabar.".to_string(),
                response_type: Some("neutral".to_string()),
            }
        );
    }

    #[test]
    fn test_plan_crisis_uses_fallback() {
        assert_eq!(
            plan(json!([{"json": {"type": "crisis", "text": "", "crisis_flag": true, "subtype": "hard_block"}}])),
            ReplyPlan::Crisis {
                text: HARD_BLOCK_CRISIS_MESSAGE.to_string(),
                meta: None,
            }
        );
    }

    #[test]
    fn test_plan_crisis_flag_with_text_keeps_text_and_meta() {
        match plan(json!({"text": "Kami di sini.", "crisis_flag": true, "meta": {"level": 2}})) {
            ReplyPlan::Crisis { text, meta } => {
                assert_eq!(text, "Kami di sini.");
                assert_eq!(meta.unwrap()["level"], 2);
            }
            other => panic!("Expected crisis plan, got {other:?}"),
        }
    }

    #[test]
    fn test_plan_no_text() {
        assert_eq!(plan(json!({"type": "neutral"})), ReplyPlan::NoText);
        assert_eq!(plan(json!({"text": "**"})), ReplyPlan::NoText);
        assert_eq!(plan(json!(42)), ReplyPlan::NoText);
    }
}
