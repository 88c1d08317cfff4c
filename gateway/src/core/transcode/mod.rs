//! Audio normalization into the canonical PCM WAV container.
//!
//! Transcription providers want 16 kHz mono WAV. Clients send whatever their
//! recorder produces (WebM/Opus from browsers, Ogg from Firefox, MP3 from
//! uploads), often with a wrong or missing content type. The transcoder:
//!
//! 1. Returns canonical input untouched.
//! 2. Sniffs the real container from magic bytes, overriding the declared type.
//! 3. Tries an ordered list of explicit input formats with the external tool.
//! 4. Falls back to one auto-detect run before giving up.
//!
//! The format list is a guessing strategy for mislabelled containers, not a
//! retry policy: the same input is never fed twice with the same format.

mod ffmpeg;
pub mod sniff;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub use ffmpeg::{FfmpegTranscoder, resolve_binary};
pub use sniff::{AudioContainer, is_canonical, sniff};

/// Containers tried after the sniffed/declared one, in order.
const FALLBACK_ORDER: [AudioContainer; 3] = [
    AudioContainer::Webm,
    AudioContainer::Ogg,
    AudioContainer::Mpeg,
];

/// Maximum number of characters of tool diagnostics kept in errors.
pub const MAX_DIAGNOSTIC_CHARS: usize = 800;

/// Errors produced while converting audio.
#[derive(Debug, Error)]
pub enum TranscodeError {
    /// Nothing to convert
    #[error("Empty audio input")]
    EmptyInput,

    /// The external executable could not be started at all
    #[error("Transcoder '{binary}' could not be started: {reason}")]
    Unavailable { binary: String, reason: String },

    /// Every attempt, including auto-detection, was rejected by the tool
    #[error("Transcoder failed: code={code:?}, stderr={stderr}")]
    Failed { code: Option<i32>, stderr: String },

    /// The tool exited successfully but wrote nothing
    #[error("Transcoder produced empty output")]
    EmptyOutput,

    /// Scratch file handling failed
    #[error("Scratch file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for transcoding operations.
pub type TranscodeResult<T> = Result<T, TranscodeError>;

/// Converts arbitrary compressed audio into canonical WAV bytes.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Convert `audio` (declared as `declared_mime`, if known) into canonical WAV.
    async fn to_wav(&self, audio: Bytes, declared_mime: Option<&str>) -> TranscodeResult<Bytes>;
}

/// Resolve the container the input most likely is.
///
/// A recognised signature always wins over the declared type.
pub fn effective_container(data: &[u8], declared_mime: Option<&str>) -> Option<AudioContainer> {
    sniff(data).or_else(|| declared_mime.and_then(AudioContainer::from_mime))
}

/// Ordered, duplicate-free list of explicit input formats to attempt.
///
/// The canonical container never appears: canonical input is returned before
/// any attempt is planned.
pub fn plan_attempts(effective: Option<AudioContainer>) -> Vec<AudioContainer> {
    let mut plan = Vec::with_capacity(FALLBACK_ORDER.len() + 1);
    if let Some(container) = effective.filter(|c| *c != AudioContainer::Wav) {
        plan.push(container);
    }
    for container in FALLBACK_ORDER {
        if !plan.contains(&container) {
            plan.push(container);
        }
    }
    plan
}

/// Keep at most [`MAX_DIAGNOSTIC_CHARS`] characters of tool output.
pub(crate) fn truncate_diagnostic(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim()
        .chars()
        .take(MAX_DIAGNOSTIC_CHARS)
        .collect()
}
