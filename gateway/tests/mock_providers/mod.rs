//! Mock Provider Servers
//!
//! One `wiremock` server stands in for every upstream the bridge talks to:
//! - ElevenLabs speech-to-text (`POST /v1/speech-to-text`)
//! - ElevenLabs text-to-speech (`POST /v1/text-to-speech/{voice}/stream`)
//! - The n8n orchestration webhook (`POST /webhook/chat`)

// Allow dead code in test infrastructure - not every test binary uses every mock
#![allow(dead_code)]

use std::time::Duration;

use serde_json::Value;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use crate::fixtures::{TEST_API_KEY, TEST_INTERNAL_TOKEN, config_for};

pub const STT_PATH: &str = "/v1/speech-to-text";
pub const WEBHOOK_PATH: &str = "/webhook/chat";

pub fn tts_path(voice_id: &str) -> String {
    format!("/v1/text-to-speech/{voice_id}/stream")
}

pub struct ProviderMocks {
    pub server: MockServer,
}

impl ProviderMocks {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn config(&self) -> speech_bridge::ServerConfig {
        config_for(&self.uri())
    }

    /// Transcription succeeds with `transcript`
    pub async fn stt_returns(&self, transcript: &str) {
        Mock::given(method("POST"))
            .and(path(STT_PATH))
            .and(header("xi-api-key", TEST_API_KEY))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"text": transcript, "language_code": "id"})),
            )
            .mount(&self.server)
            .await;
    }

    pub async fn stt_fails(&self, status: u16, body: &str) {
        Mock::given(method("POST"))
            .and(path(STT_PATH))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&self.server)
            .await;
    }

    /// Orchestration answers `transcript` with `body`
    pub async fn webhook_returns(&self, transcript: &str, body: Value) {
        Mock::given(method("POST"))
            .and(path(WEBHOOK_PATH))
            .and(header("X-Internal-Token", TEST_INTERNAL_TOKEN))
            .and(body_partial_json(serde_json::json!({"text": transcript})))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(&self.server)
            .await;
    }

    /// Orchestration answers any transcript with `body` after `delay`
    pub async fn webhook_delayed(&self, body: Value, delay: Duration) {
        Mock::given(method("POST"))
            .and(path(WEBHOOK_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(body).set_delay(delay))
            .mount(&self.server)
            .await;
    }

    pub async fn webhook_fails(&self, status: u16, body: &str) {
        Mock::given(method("POST"))
            .and(path(WEBHOOK_PATH))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&self.server)
            .await;
    }

    /// Synthesis with `voice_id` of exactly `text` returns `audio`
    pub async fn tts_returns(&self, voice_id: &str, text: &str, audio: &[u8]) {
        Mock::given(method("POST"))
            .and(path(tts_path(voice_id)))
            .and(query_param("output_format", "mp3_44100_128"))
            .and(header("xi-api-key", TEST_API_KEY))
            .and(body_partial_json(serde_json::json!({"text": text})))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "audio/mpeg")
                    .set_body_bytes(audio.to_vec()),
            )
            .expect(1)
            .mount(&self.server)
            .await;
    }

    pub async fn tts_fails(&self, voice_id: &str, status: u16, body: &str) {
        Mock::given(method("POST"))
            .and(path(tts_path(voice_id)))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&self.server)
            .await;
    }

    /// Synthesis must not be called at all
    pub async fn tts_never_called(&self) {
        Mock::given(method("POST"))
            .and(wiremock::matchers::path_regex(r"^/v1/text-to-speech/.*"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&self.server)
            .await;
    }

    pub async fn requests_to(&self, request_path: &str) -> Vec<Request> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.url.path() == request_path)
            .collect()
    }
}
