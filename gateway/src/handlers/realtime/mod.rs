//! Realtime voice session over WebSocket
//!
//! # Protocol
//!
//! ## Client → Server
//!
//! - **start**: Begin an utterance (`session_id`, `language`, `content_type` or `mime`)
//! - **Binary frames**: Compressed audio, appended to the utterance buffer
//! - **stop**: End the utterance and run transcode → transcribe → orchestrate → speak
//!
//! ## Server → Client
//!
//! - **ready**: Waiting for the next utterance
//! - **audio_start** / **Binary frames** / **audio_end**: Synthesized reply
//! - **crisis**: Safety message delivered as text
//! - **debug**: Transcript and raw orchestration result when nothing could be spoken
//! - **error**: `detail` code plus an optional `message`

mod backlog;
mod handler;
pub mod messages;
pub mod session;

pub use handler::realtime_handler;
