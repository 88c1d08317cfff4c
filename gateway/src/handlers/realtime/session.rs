//! Per-connection utterance state machine
//!
//! A session collects binary audio between `start` and `stop`, then hands the
//! buffered utterance to [`process_utterance`], which runs the pipeline and
//! reports every outcome as [`SessionEvent`]s on the outgoing channel.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use futures::{FutureExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::core::orchestration::safety::CRISIS_TYPE;
use crate::core::pipeline::DEFAULT_SESSION_ID;
use crate::core::tts::SynthesisRequest;
use crate::core::{ReplyPlan, VoicePipeline, plan_reply};

use super::messages::{ClientFrame, SessionEvent, SessionRoute, StartFrame, detail};

/// Maximum characters of an adapter error carried in an `error` event
pub const MAX_EVENT_MESSAGE_CHARS: usize = 200;

/// `audio_start.type` when the response carries no type
const UNKNOWN_RESPONSE_TYPE: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Buffering,
    Processing,
    Closed,
}

/// The outgoing channel is gone; nothing more can reach the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelClosed;

/// A complete utterance taken out of the session buffer.
#[derive(Debug, Clone)]
pub struct Utterance {
    pub audio: Bytes,
    pub session_id: String,
    pub language: Option<String>,
    pub input_mime: String,
}

/// What the connection loop should do after a frame.
#[derive(Debug)]
pub enum FrameOutcome {
    Continue,
    /// `stop` produced an utterance to run
    Process(Utterance),
}

pub struct RealtimeSession {
    state: SessionState,
    buffer: BytesMut,
    overflowed: bool,
    max_bytes: usize,
    start: StartFrame,
    tx: mpsc::Sender<SessionRoute>,
}

impl RealtimeSession {
    pub fn new(tx: mpsc::Sender<SessionRoute>, max_bytes: usize) -> Self {
        Self {
            state: SessionState::Idle,
            buffer: BytesMut::new(),
            overflowed: false,
            max_bytes,
            start: StartFrame::default(),
            tx,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn buffered_bytes(&self) -> usize {
        self.buffer.len()
    }

    async fn emit(&self, event: SessionEvent) -> Result<(), ChannelClosed> {
        emit(&self.tx, event).await
    }

    /// Handle a control frame.
    pub async fn handle_text(&mut self, text: &str) -> Result<FrameOutcome, ChannelClosed> {
        let frame = match serde_json::from_str::<ClientFrame>(text) {
            Ok(frame) => frame,
            Err(e) => {
                debug!("Unrecognized text frame: {}", e);
                self.emit(SessionEvent::error(detail::UNKNOWN_TEXT_FRAME))
                    .await?;
                return Ok(FrameOutcome::Continue);
            }
        };

        match frame {
            ClientFrame::Start(start) => {
                self.reset_buffer();
                info!(
                    session_id = start.session_id().as_deref().unwrap_or(DEFAULT_SESSION_ID),
                    input_mime = %start.input_mime(),
                    "Utterance started"
                );
                self.start = start;
                self.state = SessionState::Buffering;
                self.emit(SessionEvent::Ready).await?;
                Ok(FrameOutcome::Continue)
            }
            ClientFrame::Stop => self.finish_utterance().await,
        }
    }

    /// Append raw audio to the buffer.
    ///
    /// Frames that would push the buffer past the upload limit are dropped and
    /// the overflow is reported on the next `stop`.
    pub fn handle_binary(&mut self, data: &[u8]) {
        if self.overflowed {
            return;
        }
        if self.buffer.len() + data.len() > self.max_bytes {
            warn!(
                buffered = self.buffer.len(),
                incoming = data.len(),
                limit = self.max_bytes,
                "Utterance exceeds upload limit"
            );
            self.overflowed = true;
            return;
        }
        self.buffer.extend_from_slice(data);
    }

    async fn finish_utterance(&mut self) -> Result<FrameOutcome, ChannelClosed> {
        if self.overflowed {
            self.reset_buffer();
            self.state = SessionState::Idle;
            self.emit(SessionEvent::error(detail::AUDIO_TOO_LARGE)).await?;
            return Ok(FrameOutcome::Continue);
        }
        if self.buffer.is_empty() {
            self.state = SessionState::Idle;
            self.emit(SessionEvent::error(detail::EMPTY_AUDIO)).await?;
            return Ok(FrameOutcome::Continue);
        }

        self.state = SessionState::Processing;
        let audio = self.buffer.split().freeze();
        Ok(FrameOutcome::Process(Utterance {
            audio,
            session_id: self
                .start
                .session_id()
                .unwrap_or_else(|| DEFAULT_SESSION_ID.to_string()),
            language: self.start.language(),
            input_mime: self.start.input_mime(),
        }))
    }

    /// Record audio that was dropped before reaching the buffer.
    ///
    /// The next `stop` reports `audio_too_large`; a `start` clears the mark.
    pub fn mark_overflow(&mut self) {
        self.overflowed = true;
    }

    /// Return to `Idle` once an utterance has been processed.
    pub fn finish_processing(&mut self) {
        if self.state == SessionState::Processing {
            self.state = SessionState::Idle;
        }
    }

    /// Release the buffer; the session accepts nothing afterwards.
    pub fn close(&mut self) {
        self.buffer = BytesMut::new();
        self.overflowed = false;
        self.state = SessionState::Closed;
    }

    fn reset_buffer(&mut self) {
        self.buffer.clear();
        self.overflowed = false;
    }
}

async fn emit(tx: &mpsc::Sender<SessionRoute>, event: SessionEvent) -> Result<(), ChannelClosed> {
    tx.send(SessionRoute::Event(event))
        .await
        .map_err(|_| ChannelClosed)
}

/// Cut a message down to a character budget.
pub fn truncate_message(message: &str, max_chars: usize) -> String {
    message.chars().take(max_chars).collect()
}

async fn report_failure(
    tx: &mpsc::Sender<SessionRoute>,
    detail: &str,
    error: String,
) -> Result<(), ChannelClosed> {
    let message = truncate_message(&error, MAX_EVENT_MESSAGE_CHARS);
    emit(tx, SessionEvent::error_with_message(detail, message)).await?;
    emit(tx, SessionEvent::Ready).await
}

/// Run one utterance through the pipeline, reporting progress as events.
///
/// Adapter failures become `error` events. A panic is reported with its message
/// and returns `false`, as does a closed channel; the session must end then.
pub async fn process_utterance(
    pipeline: Arc<VoicePipeline>,
    tx: mpsc::Sender<SessionRoute>,
    utterance: Utterance,
) -> bool {
    let run = AssertUnwindSafe(run_utterance(&pipeline, &tx, utterance)).catch_unwind();
    match run.await {
        Ok(Ok(())) => true,
        Ok(Err(ChannelClosed)) => {
            debug!("Outgoing channel closed during processing");
            false
        }
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "internal error".to_string());
            error!("Utterance processing panicked: {}", message);
            let _ = emit(&tx, SessionEvent::error(message)).await;
            false
        }
    }
}

async fn run_utterance(
    pipeline: &VoicePipeline,
    tx: &mpsc::Sender<SessionRoute>,
    utterance: Utterance,
) -> Result<(), ChannelClosed> {
    let Utterance {
        audio,
        session_id,
        language,
        input_mime,
    } = utterance;
    info!(
        session_id = %session_id,
        bytes = audio.len(),
        input_mime = %input_mime,
        "Processing utterance"
    );

    let wav = match pipeline.to_canonical(audio, Some(input_mime.as_str())).await {
        Ok(wav) => wav,
        Err(e) => {
            warn!("WAV conversion failed: {}", e);
            let message = truncate_message(&e.to_string(), MAX_EVENT_MESSAGE_CHARS);
            return emit(
                tx,
                SessionEvent::error_with_message(detail::WAV_CONVERSION_FAILED, message),
            )
            .await;
        }
    };

    let transcript = match pipeline.transcribe(wav, language).await {
        Ok(transcript) => transcript,
        Err(e) => {
            warn!("Transcription failed: {}", e);
            return report_failure(tx, detail::STT_FAILED, e.to_string()).await;
        }
    };
    debug!(transcript = %transcript, "Transcribed utterance");

    let response = match pipeline.converse(&session_id, &transcript).await {
        Ok(response) => response,
        Err(e) => {
            warn!("Orchestration failed: {}", e);
            return report_failure(tx, detail::ORCHESTRATION_FAILED, e.to_string()).await;
        }
    };
    debug!(payload = %response.payload, "Orchestration response");

    match plan_reply(&response) {
        ReplyPlan::NoText => {
            warn!(session_id = %session_id, "Orchestration returned no speakable text");
            emit(
                tx,
                SessionEvent::Debug {
                    transcript,
                    n8n_result: response.payload,
                },
            )
            .await?;
            emit(tx, SessionEvent::error(detail::NO_TEXT)).await
        }
        ReplyPlan::Crisis { text, meta } => {
            info!(session_id = %session_id, "Delivering crisis response as text");
            emit(
                tx,
                SessionEvent::Crisis {
                    response_type: CRISIS_TYPE.to_string(),
                    text,
                    meta,
                },
            )
            .await?;
            emit(tx, SessionEvent::Ready).await
        }
        ReplyPlan::Speak {
            text,
            response_type,
        } => speak(pipeline, tx, text, response_type).await,
    }
}

async fn speak(
    pipeline: &VoicePipeline,
    tx: &mpsc::Sender<SessionRoute>,
    text: String,
    response_type: Option<String>,
) -> Result<(), ChannelClosed> {
    let request = SynthesisRequest::new(text, response_type.clone());
    let mut stream = match pipeline.synthesizer.stream(request) {
        Ok(stream) => stream,
        Err(e) => {
            warn!("Synthesis failed: {}", e);
            return report_failure(tx, detail::TTS_FAILED, e.to_string()).await;
        }
    };

    emit(
        tx,
        SessionEvent::AudioStart {
            media_type: stream.media_type.to_string(),
            response_type: response_type.unwrap_or_else(|| UNKNOWN_RESPONSE_TYPE.to_string()),
        },
    )
    .await?;

    let mut chunks = 0usize;
    let mut total = 0usize;
    while let Some(chunk) = stream.chunks.next().await {
        match chunk {
            Ok(data) if data.is_empty() => {}
            Ok(data) => {
                chunks += 1;
                total += data.len();
                tx.send(SessionRoute::Audio(data))
                    .await
                    .map_err(|_| ChannelClosed)?;
            }
            Err(e) => {
                warn!(chunks, bytes = total, "Synthesis stream failed: {}", e);
                return report_failure(tx, detail::TTS_FAILED, e.to_string()).await;
            }
        }
    }
    info!(chunks, bytes = total, "Streamed synthesized audio");

    emit(tx, SessionEvent::AudioEnd).await?;
    emit(tx, SessionEvent::Ready).await
}
