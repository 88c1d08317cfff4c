//! `ffmpeg` backed transcoder.
//!
//! Every conversion gets its own scratch directory. The directory (and the
//! input/output files inside it) is removed when the `TempDir` guard drops,
//! which covers success, failure and cancellation alike. Child processes are
//! spawned with `kill_on_drop` so an abandoned session does not leave a
//! conversion running.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::{
    AudioContainer, TranscodeError, TranscodeResult, Transcoder, effective_container,
    is_canonical, plan_attempts, truncate_diagnostic,
};

/// Environment variables consulted when no executable is configured.
const BINARY_ENV_VARS: [&str; 2] = ["FFMPEG_PATH", "FFMPEG_BIN"];

/// Executable looked up on `PATH` as a last resort.
const DEFAULT_BINARY: &str = "ffmpeg";

/// Resolve the transcoder executable.
///
/// Order: explicit configuration, then `FFMPEG_PATH` / `FFMPEG_BIN`, then `ffmpeg`
/// on `PATH`. Surrounding whitespace and quotes are stripped from configured values.
pub fn resolve_binary(configured: Option<&str>) -> String {
    let clean = |value: &str| value.trim().trim_matches('"').to_string();

    if let Some(value) = configured.map(clean).filter(|v| !v.is_empty()) {
        return value;
    }
    for key in BINARY_ENV_VARS {
        if let Some(value) = std::env::var(key).ok().map(|v| clean(&v)).filter(|v| !v.is_empty()) {
            return value;
        }
    }
    DEFAULT_BINARY.to_string()
}

/// Outcome of a single invocation.
enum Attempt {
    Produced(Vec<u8>),
    Rejected { code: Option<i32>, stderr: String },
    Empty,
}

/// Transcoder that shells out to `ffmpeg`.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    binary: String,
    sample_rate: u32,
    channels: u16,
}

impl FfmpegTranscoder {
    /// Create a transcoder producing 16 kHz mono WAV.
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            sample_rate: 16_000,
            channels: 1,
        }
    }

    /// Create a transcoder from the configured executable, resolving fallbacks.
    pub fn from_config(configured: Option<&str>) -> Self {
        Self::new(resolve_binary(configured))
    }

    /// Executable this transcoder invokes
    pub fn binary(&self) -> &str {
        &self.binary
    }

    async fn run(
        &self,
        input: &Path,
        output: &Path,
        demuxer: Option<&str>,
    ) -> TranscodeResult<Attempt> {
        // A rejected attempt may leave a partial file behind
        match tokio::fs::remove_file(output).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let mut command = Command::new(&self.binary);
        command.args(["-hide_banner", "-loglevel", "error", "-nostdin", "-y"]);
        if let Some(format) = demuxer {
            command.args(["-f", format]);
        }
        command
            .arg("-i")
            .arg(input)
            .args(["-vn", "-ac"])
            .arg(self.channels.to_string())
            .arg("-ar")
            .arg(self.sample_rate.to_string())
            .args(["-f", "wav"])
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let result = command
            .output()
            .await
            .map_err(|e| TranscodeError::Unavailable {
                binary: self.binary.clone(),
                reason: e.to_string(),
            })?;

        if !result.status.success() {
            return Ok(Attempt::Rejected {
                code: result.status.code(),
                stderr: truncate_diagnostic(&result.stderr),
            });
        }

        match tokio::fs::read(output).await {
            Ok(data) if data.is_empty() => Ok(Attempt::Empty),
            Ok(data) => Ok(Attempt::Produced(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Attempt::Rejected {
                code: result.status.code(),
                stderr: "no output file written".to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn to_wav(&self, audio: Bytes, declared_mime: Option<&str>) -> TranscodeResult<Bytes> {
        if audio.is_empty() {
            return Err(TranscodeError::EmptyInput);
        }

        if declared_mime.is_some_and(is_canonical) {
            return Ok(audio);
        }

        let effective = effective_container(&audio, declared_mime);
        if effective == Some(AudioContainer::Wav) {
            debug!(
                declared = ?declared_mime,
                "Input carries a RIFF signature, skipping conversion"
            );
            return Ok(audio);
        }

        let scratch = tempfile::Builder::new()
            .prefix("speech-bridge-")
            .tempdir()?;
        let extension = effective.map(|c| c.extension()).unwrap_or("bin");
        let input_path = scratch.path().join(format!("input.{extension}"));
        let output_path = scratch.path().join("output.wav");
        tokio::fs::write(&input_path, &audio).await?;

        for container in plan_attempts(effective) {
            match self
                .run(&input_path, &output_path, Some(container.demuxer()))
                .await?
            {
                Attempt::Produced(data) => {
                    info!(
                        input_bytes = audio.len(),
                        output_bytes = data.len(),
                        format = container.demuxer(),
                        "Converted audio to WAV"
                    );
                    return Ok(Bytes::from(data));
                }
                Attempt::Rejected { code, stderr } => {
                    debug!(
                        format = container.demuxer(),
                        ?code,
                        %stderr,
                        "Transcoder rejected input format"
                    );
                }
                Attempt::Empty => {
                    debug!(format = container.demuxer(), "Transcoder produced empty output");
                }
            }
        }

        match self.run(&input_path, &output_path, None).await? {
            Attempt::Produced(data) => {
                info!(
                    input_bytes = audio.len(),
                    output_bytes = data.len(),
                    "Converted audio to WAV with format auto-detection"
                );
                Ok(Bytes::from(data))
            }
            Attempt::Rejected { code, stderr } => {
                warn!(?code, "All transcoder attempts failed");
                Err(TranscodeError::Failed { code, stderr })
            }
            Attempt::Empty => Err(TranscodeError::EmptyOutput),
        }
    }
}
