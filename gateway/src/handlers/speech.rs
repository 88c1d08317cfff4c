//! Synchronous speech endpoints
//!
//! Request/response equivalents of the realtime pipeline for clients that upload
//! a complete recording as `multipart/form-data`.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json,
    body::Body,
    extract::{Multipart, State},
    http::{HeaderMap, HeaderName, HeaderValue, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::core::orchestration::{NormalizedResponse, is_crisis};
use crate::core::orchestration::safety::CRISIS_TYPE;
use crate::core::text::sanitize;
use crate::core::tts::SynthesisRequest;
use crate::core::{ReplyPlan, VoicePipeline, plan_reply};
use crate::errors::app_error::{AppError, AppResult};
use crate::state::AppState;

/// `type` reported by `/stt-chat` when the response carries none
const DEFAULT_CHAT_TYPE: &str = "chat";

/// Fields read from an upload form
#[derive(Debug, Default)]
pub struct SpeechForm {
    pub audio: Option<UploadedAudio>,
    pub language: Option<String>,
    pub session_id: Option<String>,
}

#[derive(Debug)]
pub struct UploadedAudio {
    pub data: Bytes,
    pub content_type: Option<String>,
    pub file_name: Option<String>,
}

impl SpeechForm {
    /// Read the form. The upload may be sent as `file` or `audio`; `file` wins.
    pub async fn read(mut multipart: Multipart, max_bytes: usize) -> AppResult<Self> {
        let mut form = SpeechForm::default();
        let mut audio_field: Option<UploadedAudio> = None;

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            match name.as_str() {
                "file" | "audio" => {
                    let content_type = field.content_type().map(str::to_string);
                    let file_name = field.file_name().map(str::to_string);
                    let data = field.bytes().await?;
                    if data.len() > max_bytes {
                        return Err(AppError::BadRequest(format!(
                            "Audio too large: {} bytes (max: {} bytes)",
                            data.len(),
                            max_bytes
                        )));
                    }
                    let upload = UploadedAudio {
                        data,
                        content_type,
                        file_name,
                    };
                    if name == "file" {
                        form.audio = Some(upload);
                    } else {
                        audio_field = Some(upload);
                    }
                }
                "language" => form.language = non_empty(field.text().await?),
                "session_id" => form.session_id = non_empty(field.text().await?),
                other => debug!("Ignoring form field '{}'", other),
            }
        }

        if form.audio.is_none() {
            form.audio = audio_field;
        }
        Ok(form)
    }

    fn take_audio(&mut self) -> AppResult<UploadedAudio> {
        let audio = self.audio.take().ok_or_else(|| {
            AppError::MissingField("Missing file upload: provide 'file' or 'audio' field".into())
        })?;
        if audio.data.is_empty() {
            return Err(AppError::BadRequest("Empty audio upload".into()));
        }
        Ok(audio)
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Transcode when needed, then transcribe.
async fn transcribe_upload(
    pipeline: &VoicePipeline,
    audio: UploadedAudio,
    language: Option<String>,
) -> AppResult<String> {
    info!(
        bytes = audio.data.len(),
        content_type = audio.content_type.as_deref().unwrap_or("unknown"),
        file_name = audio.file_name.as_deref().unwrap_or(""),
        "Transcribing upload"
    );
    let wav = pipeline
        .to_canonical(audio.data, audio.content_type.as_deref())
        .await?;
    let transcript = pipeline.transcribe(wav, language).await?;
    debug!(transcript = %transcript, "Transcribed upload");
    Ok(transcript)
}

/// Text and category to synthesize for a resolved response.
fn speech_for(response: &NormalizedResponse) -> AppResult<(String, Option<String>)> {
    match plan_reply(response) {
        ReplyPlan::NoText => Err(AppError::BadGateway("n8n did not return text".into())),
        ReplyPlan::Crisis { text, .. } => Ok((sanitize(&text), Some(CRISIS_TYPE.to_string()))),
        ReplyPlan::Speak {
            text,
            response_type,
        } => Ok((text, response_type)),
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TranscriptResponse {
    pub transcript: String,
}

/// `POST /stt`: transcription only.
pub async fn stt_handler(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> AppResult<Json<TranscriptResponse>> {
    let mut form = SpeechForm::read(multipart, state.config.max_upload_bytes()).await?;
    let audio = form.take_audio()?;
    let transcript = transcribe_upload(&state.pipeline, audio, form.language.take()).await?;
    Ok(Json(TranscriptResponse { transcript }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(rename = "type")]
    pub response_type: String,
    pub text: String,
    pub crisis_flag: Option<bool>,
    pub meta: Option<Map<String, Value>>,
}

/// `POST /stt-chat`: transcribe, then forward to orchestration.
pub async fn stt_chat_handler(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> AppResult<Json<ChatResponse>> {
    let mut form = SpeechForm::read(multipart, state.config.max_upload_bytes()).await?;
    let session_id = form
        .session_id
        .take()
        .ok_or_else(|| AppError::MissingField("session_id is required".into()))?;
    let audio = form.take_audio()?;

    let transcript = transcribe_upload(&state.pipeline, audio, form.language.take()).await?;
    let response = state.pipeline.converse(&session_id, &transcript).await?;

    let result = response.result;
    let text = result
        .text()
        .map(str::to_string)
        .ok_or_else(|| AppError::BadGateway("n8n did not return text".into()))?;
    Ok(Json(ChatResponse {
        response_type: result
            .response_type
            .clone()
            .unwrap_or_else(|| DEFAULT_CHAT_TYPE.to_string()),
        text,
        crisis_flag: result.crisis_flag,
        meta: result.meta.clone(),
    }))
}

fn header_value(value: impl ToString) -> HeaderValue {
    HeaderValue::from_str(&value.to_string()).unwrap_or_else(|_| HeaderValue::from_static(""))
}

/// `POST /tts/stt-chat-tts`: full pipeline returning one audio body.
pub async fn stt_chat_tts_handler(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> AppResult<Response> {
    let mut form = SpeechForm::read(multipart, state.config.max_upload_bytes()).await?;
    let audio = form.take_audio()?;
    let session_id = form
        .session_id
        .take()
        .ok_or_else(|| AppError::BadRequest("session_id is required".into()))?;

    let started = Instant::now();
    let transcript = transcribe_upload(&state.pipeline, audio, form.language.take()).await?;
    let after_stt = Instant::now();

    let response = state.pipeline.converse(&session_id, &transcript).await?;
    let after_chat = Instant::now();

    let crisis = is_crisis(&response.result);
    let (text, response_type) = speech_for(&response)?;
    let text_len = text.chars().count();
    let audio = state
        .pipeline
        .synthesizer
        .synthesize(SynthesisRequest::new(text, response_type.clone()))
        .await?;
    let after_tts = Instant::now();

    info!(
        bytes = audio.data.len(),
        stt_ms = (after_stt - started).as_millis() as u64,
        chat_ms = (after_chat - after_stt).as_millis() as u64,
        tts_ms = (after_tts - after_chat).as_millis() as u64,
        "Synthesized reply"
    );

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(audio.media_type));
    let perf = [
        ("x-perf-stt-ms", (after_stt - started).as_millis()),
        ("x-perf-chat-ms", (after_chat - after_stt).as_millis()),
        ("x-perf-tts-ms", (after_tts - after_chat).as_millis()),
    ];
    for (name, millis) in perf {
        headers.insert(HeaderName::from_static(name), header_value(millis));
    }
    headers.insert(
        HeaderName::from_static("x-chat-type"),
        header_value(response_type.as_deref().unwrap_or("unknown")),
    );
    headers.insert(
        HeaderName::from_static("x-chat-crisis"),
        HeaderValue::from_static(if crisis { "True" } else { "False" }),
    );
    headers.insert(HeaderName::from_static("x-chat-text-len"), header_value(text_len));

    Ok((headers, audio.data).into_response())
}

/// `POST /tts/stt-chat-tts-stream`: full pipeline streaming the synthesized audio.
///
/// The first chunk is awaited before responding so an upstream failure still
/// maps to an error status.
pub async fn stt_chat_tts_stream_handler(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> AppResult<Response> {
    let mut form = SpeechForm::read(multipart, state.config.max_upload_bytes()).await?;
    let audio = form.take_audio()?;
    let session_id = form
        .session_id
        .take()
        .ok_or_else(|| AppError::BadRequest("session_id is required".into()))?;

    let transcript = transcribe_upload(&state.pipeline, audio, form.language.take()).await?;
    let response = state.pipeline.converse(&session_id, &transcript).await?;
    let (text, response_type) = speech_for(&response)?;

    let stream = state
        .pipeline
        .synthesizer
        .stream(SynthesisRequest::new(text, response_type))?;
    let media_type = stream.media_type;
    let mut chunks = stream.chunks;
    let first = match chunks.next().await {
        Some(Ok(chunk)) => Some(Ok(chunk)),
        Some(Err(e)) => return Err(e.into()),
        None => None,
    };

    let body = Body::from_stream(futures::stream::iter(first).chain(chunks));
    Ok(([(header::CONTENT_TYPE, media_type)], body).into_response())
}
