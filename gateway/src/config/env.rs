//! Environment variable access.
//!
//! `.env` values are loaded into the process environment by `main` before any
//! of these are read, so real environment variables win over `.env` entries.

use std::env;
use std::fmt::Display;
use std::str::FromStr;

pub const HOST: &str = "HOST";
pub const PORT: &str = "PORT";
pub const XI_API_KEY: &str = "XI_API_KEY";
pub const ELEVEN_STT_URL: &str = "ELEVEN_STT_URL";
pub const ELEVEN_STT_MODEL_ID: &str = "ELEVEN_STT_MODEL_ID";
pub const ELEVEN_TTS_URL_TMPL: &str = "ELEVEN_TTS_URL_TMPL";
pub const ELEVEN_TTS_MODEL_ID: &str = "ELEVEN_TTS_MODEL_ID";
pub const VOICE_ID_EMPATHIC: &str = "VOICE_ID_EMPATHIC";
pub const VOICE_ID_NEUTRAL: &str = "VOICE_ID_NEUTRAL";
pub const VOICE_ID_ALERT: &str = "VOICE_ID_ALERT";
pub const VOICE_ID_CRISIS: &str = "VOICE_ID_CRISIS";
pub const DEFAULT_VOICE_ID: &str = "DEFAULT_VOICE_ID";
pub const DEFAULT_TTS_FORMAT: &str = "DEFAULT_TTS_FORMAT";
pub const N8N_WEBHOOK_URL: &str = "N8N_WEBHOOK_URL";
pub const N8N_INTERNAL_TOKEN: &str = "N8N_INTERNAL_TOKEN";
pub const HTTP_TIMEOUT_S: &str = "HTTP_TIMEOUT_S";
pub const MAX_UPLOAD_MB: &str = "MAX_UPLOAD_MB";
pub const FFMPEG_PATH: &str = "FFMPEG_PATH";
pub const FFMPEG_BIN: &str = "FFMPEG_BIN";
pub const CORS_ORIGINS: &str = "CORS_ORIGINS";
pub const RATE_LIMIT_RPS: &str = "RATE_LIMIT_RPS";
pub const RATE_LIMIT_BURST: &str = "RATE_LIMIT_BURST";

/// Every variable the service reads
pub const ALL_VARS: [&str; 22] = [
    HOST,
    PORT,
    XI_API_KEY,
    ELEVEN_STT_URL,
    ELEVEN_STT_MODEL_ID,
    ELEVEN_TTS_URL_TMPL,
    ELEVEN_TTS_MODEL_ID,
    VOICE_ID_EMPATHIC,
    VOICE_ID_NEUTRAL,
    VOICE_ID_ALERT,
    VOICE_ID_CRISIS,
    DEFAULT_VOICE_ID,
    DEFAULT_TTS_FORMAT,
    N8N_WEBHOOK_URL,
    N8N_INTERNAL_TOKEN,
    HTTP_TIMEOUT_S,
    MAX_UPLOAD_MB,
    FFMPEG_PATH,
    FFMPEG_BIN,
    CORS_ORIGINS,
    RATE_LIMIT_RPS,
    RATE_LIMIT_BURST,
];

/// Trimmed value of a variable; unset and blank are both `None`.
pub fn string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// First set variable among `keys`.
pub fn first_of(keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| string(key))
}

/// Parse a variable, reporting the variable name on failure.
pub fn parse<T>(key: &str) -> Result<Option<T>, Box<dyn std::error::Error>>
where
    T: FromStr,
    T::Err: Display,
{
    match string(key) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| format!("Invalid value for {key}: '{raw}' ({e})").into()),
        None => Ok(None),
    }
}
