//! Realtime session wire types
//!
//! Clients drive an utterance with `start`, raw binary audio frames and `stop`.
//! The server answers with JSON events tagged by `event` and streams synthesized
//! audio back as binary frames between `audio_start` and `audio_end`.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::pipeline::DEFAULT_INPUT_MIME;

// =============================================================================
// Incoming Messages (Client -> Server)
// =============================================================================

/// Control frames sent by the client as text
#[derive(Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Begin a new utterance
    Start(StartFrame),
    /// Finish the utterance and run the pipeline
    Stop,
}

/// Metadata recorded when an utterance starts
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct StartFrame {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    /// Older clients send the content type under this name
    #[serde(default)]
    pub mime: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl StartFrame {
    /// Declared audio type: `content_type`, then `mime`, then the default.
    pub fn input_mime(&self) -> String {
        non_empty(&self.content_type)
            .or_else(|| non_empty(&self.mime))
            .unwrap_or(DEFAULT_INPUT_MIME)
            .to_string()
    }

    pub fn session_id(&self) -> Option<String> {
        non_empty(&self.session_id).map(str::to_string)
    }

    pub fn language(&self) -> Option<String> {
        non_empty(&self.language).map(str::to_string)
    }
}

// =============================================================================
// Outgoing Messages (Server -> Client)
// =============================================================================

/// Events sent to the client as text
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Ready for the next utterance
    Ready,
    Error {
        detail: String,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        message: Option<String>,
    },
    /// Transcript and raw orchestration payload when nothing could be spoken
    Debug {
        transcript: String,
        n8n_result: Value,
    },
    /// Safety message delivered as text, without synthesis
    Crisis {
        #[serde(rename = "type")]
        response_type: String,
        text: String,
        meta: Option<Map<String, Value>>,
    },
    AudioStart {
        media_type: String,
        #[serde(rename = "type")]
        response_type: String,
    },
    AudioEnd,
}

impl SessionEvent {
    pub fn error(detail: impl Into<String>) -> Self {
        SessionEvent::Error {
            detail: detail.into(),
            message: None,
        }
    }

    pub fn error_with_message(detail: impl Into<String>, message: impl Into<String>) -> Self {
        SessionEvent::Error {
            detail: detail.into(),
            message: Some(message.into()),
        }
    }
}

/// Error details reported in `error` events
pub mod detail {
    pub const EMPTY_AUDIO: &str = "empty_audio";
    pub const AUDIO_TOO_LARGE: &str = "audio_too_large";
    pub const WAV_CONVERSION_FAILED: &str = "wav_conversion_failed";
    pub const STT_FAILED: &str = "stt_failed";
    pub const ORCHESTRATION_FAILED: &str = "orchestration_failed";
    pub const NO_TEXT: &str = "no_text";
    pub const TTS_FAILED: &str = "tts_failed";
    pub const UNKNOWN_TEXT_FRAME: &str = "unknown_text_frame";
    pub const IDLE_TIMEOUT: &str = "idle_timeout";
    pub const BACKLOG_EXCEEDED: &str = "backlog_exceeded";
}

/// Everything the sender task can put on the socket
#[derive(Debug)]
pub enum SessionRoute {
    /// JSON event
    Event(SessionEvent),
    /// Binary audio chunk
    Audio(Bytes),
    /// Close connection
    Close,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_start_frame_deserialization() {
        let frame: ClientFrame = serde_json::from_str(
            r#"{"type": "start", "session_id": "abc", "language": "id", "content_type": "audio/ogg"}"#,
        )
        .expect("Should deserialize");
        match frame {
            ClientFrame::Start(start) => {
                assert_eq!(start.session_id(), Some("abc".to_string()));
                assert_eq!(start.language(), Some("id".to_string()));
                assert_eq!(start.input_mime(), "audio/ogg");
            }
            _ => panic!("Expected Start variant"),
        }
    }

    #[test]
    fn test_start_frame_minimal() {
        let frame: ClientFrame = serde_json::from_str(r#"{"type": "start"}"#).unwrap();
        assert_eq!(frame, ClientFrame::Start(StartFrame::default()));
        if let ClientFrame::Start(start) = frame {
            assert_eq!(start.input_mime(), DEFAULT_INPUT_MIME);
            assert_eq!(start.session_id(), None);
        }
    }

    #[test]
    fn test_mime_alias() {
        let start = StartFrame {
            mime: Some("audio/mpeg".into()),
            ..Default::default()
        };
        assert_eq!(start.input_mime(), "audio/mpeg");

        let start = StartFrame {
            content_type: Some("audio/ogg".into()),
            mime: Some("audio/mpeg".into()),
            ..Default::default()
        };
        assert_eq!(start.input_mime(), "audio/ogg");

        let start = StartFrame {
            content_type: Some("  ".into()),
            mime: Some("audio/mpeg".into()),
            ..Default::default()
        };
        assert_eq!(start.input_mime(), "audio/mpeg");
    }

    #[test]
    fn test_stop_and_unknown_frames() {
        assert_eq!(
            serde_json::from_str::<ClientFrame>(r#"{"type": "stop"}"#).unwrap(),
            ClientFrame::Stop
        );
        assert!(serde_json::from_str::<ClientFrame>(r#"{"type": "pause"}"#).is_err());
        assert!(serde_json::from_str::<ClientFrame>(r#"{"session_id": "x"}"#).is_err());
        assert!(serde_json::from_str::<ClientFrame>("not json").is_err());
    }

    #[test]
    fn test_event_serialization() {
        assert_eq!(
            serde_json::to_value(SessionEvent::Ready).unwrap(),
            json!({"event": "ready"})
        );
        assert_eq!(
            serde_json::to_value(SessionEvent::error(detail::EMPTY_AUDIO)).unwrap(),
            json!({"event": "error", "detail": "empty_audio"})
        );
        assert_eq!(
            serde_json::to_value(SessionEvent::error_with_message(detail::STT_FAILED, "boom"))
                .unwrap(),
            json!({"event": "error", "detail": "stt_failed", "message": "boom"})
        );
        assert_eq!(
            serde_json::to_value(SessionEvent::AudioStart {
                media_type: "audio/mpeg".into(),
                response_type: "neutral".into(),
            })
            .unwrap(),
            json!({"event": "audio_start", "media_type": "audio/mpeg", "type": "neutral"})
        );
        assert_eq!(
            serde_json::to_value(SessionEvent::Crisis {
                response_type: "crisis".into(),
                text: "t".into(),
                meta: None,
            })
            .unwrap(),
            json!({"event": "crisis", "type": "crisis", "text": "t", "meta": null})
        );
        assert_eq!(
            serde_json::to_value(SessionEvent::AudioEnd).unwrap(),
            json!({"event": "audio_end"})
        );
    }
}
