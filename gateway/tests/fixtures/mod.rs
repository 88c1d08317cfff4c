//! Test Fixtures Module
//!
//! Programmatically generated audio and configuration for the integration tests.

// Allow dead code in test fixtures - not every test binary uses every helper
#![allow(dead_code)]

use speech_bridge::ServerConfig;

/// Standard sample rate for STT (16kHz)
pub const SAMPLE_RATE: u32 = 16000;

/// API key the mock providers expect
pub const TEST_API_KEY: &str = "test-xi-key";

/// Token the mock orchestration webhook expects
pub const TEST_INTERNAL_TOKEN: &str = "test-internal-token";

pub const VOICE_NEUTRAL: &str = "voice-neutral";
pub const VOICE_EMPATHIC: &str = "voice-empathic";
pub const VOICE_CRISIS: &str = "voice-crisis";
pub const VOICE_DEFAULT: &str = "voice-default";

/// Canonical 16 kHz mono 16-bit WAV holding `duration_samples` of silence
pub fn wav_silence(duration_samples: usize) -> Vec<u8> {
    let data_len = (duration_samples * 2) as u32;
    let mut wav = Vec::with_capacity(44 + data_len as usize);
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVE");
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&1u16.to_le_bytes()); // mono
    wav.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
    wav.extend_from_slice(&(SAMPLE_RATE * 2).to_le_bytes());
    wav.extend_from_slice(&2u16.to_le_bytes());
    wav.extend_from_slice(&16u16.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    wav.resize(44 + data_len as usize, 0);
    wav
}

/// Bytes starting with the EBML signature, as a browser MediaRecorder produces
pub fn webm_like(len: usize) -> Vec<u8> {
    let mut data = vec![0x1A, 0x45, 0xDF, 0xA3];
    data.resize(len.max(4), 0x42);
    data
}

/// Bytes starting with the Ogg capture pattern
pub fn ogg_like(len: usize) -> Vec<u8> {
    let mut data = b"OggS".to_vec();
    data.resize(len.max(4), 0x00);
    data
}

/// Configuration pointing every provider at `base_url`
pub fn config_for(base_url: &str) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.host = "127.0.0.1".to_string();
    config.port = 0;
    config.xi_api_key = Some(TEST_API_KEY.to_string());
    config.stt_url = format!("{base_url}/v1/speech-to-text");
    config.tts_url_template = format!("{base_url}/v1/text-to-speech/{{voice_id}}");
    config.voice_id_neutral = Some(VOICE_NEUTRAL.to_string());
    config.voice_id_empathic = Some(VOICE_EMPATHIC.to_string());
    config.voice_id_crisis = Some(VOICE_CRISIS.to_string());
    config.default_voice_id = Some(VOICE_DEFAULT.to_string());
    config.n8n_webhook_url = Some(format!("{base_url}/webhook/chat"));
    config.n8n_internal_token = Some(TEST_INTERNAL_TOKEN.to_string());
    config.http_timeout_seconds = 5;
    config.max_upload_mb = 1;
    // Non-WAV input must never reach a real transcoder in these tests
    config.ffmpeg_path = Some("/nonexistent/speech-bridge-ffmpeg".to_string());
    config.rate_limit_requests_per_second = 100_000;
    config
}
