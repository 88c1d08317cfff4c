//! Configuration module for the speech bridge
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable access
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//!
//! # Example
//! ```rust,no_run
//! use speech_bridge::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

pub mod env;
mod merge;
mod validation;
mod yaml;

pub use merge::{
    DEFAULT_HOST, DEFAULT_HTTP_TIMEOUT_SECONDS, DEFAULT_MAX_UPLOAD_MB, DEFAULT_PORT,
    DEFAULT_RATE_LIMIT_BURST, DEFAULT_RATE_LIMIT_RPS,
};

use crate::core::orchestration::WebhookConfig;
use crate::core::stt::{DEFAULT_STT_MODEL, ELEVENLABS_STT_URL, ElevenLabsSTTConfig};
use crate::core::tts::{
    DEFAULT_OUTPUT_FORMAT, DEFAULT_TTS_MODEL, ELEVENLABS_TTS_URL_TEMPLATE, ElevenLabsTTSConfig,
    VoiceTable,
};

/// Rate limits at or above this value disable the limiter entirely
pub const RATE_LIMIT_DISABLED_THRESHOLD: u32 = 100_000;

/// Server configuration
///
/// Built once at startup and shared read-only. Contains:
/// - Server settings (host, port)
/// - Speech provider endpoints, models and key
/// - Per-category voices
/// - Orchestration webhook
/// - Limits (upload size, outbound timeout) and the transcoder executable
/// - Security settings (CORS, rate limiting)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // Speech provider
    /// ElevenLabs API key, shared by transcription and synthesis
    pub xi_api_key: Option<String>,
    pub stt_url: String,
    pub stt_model_id: String,
    /// Synthesis endpoint with a `{voice_id}` placeholder
    pub tts_url_template: String,
    pub tts_model_id: String,
    pub default_tts_format: String,

    // Voices
    pub voice_id_empathic: Option<String>,
    pub voice_id_neutral: Option<String>,
    pub voice_id_alert: Option<String>,
    pub voice_id_crisis: Option<String>,
    pub default_voice_id: Option<String>,

    // Orchestration
    pub n8n_webhook_url: Option<String>,
    pub n8n_internal_token: Option<String>,

    // Limits
    /// Timeout applied uniformly to outbound provider calls
    pub http_timeout_seconds: u64,
    /// Maximum utterance/upload size in megabytes
    pub max_upload_mb: u64,

    /// Explicitly configured transcoder executable
    pub ffmpeg_path: Option<String>,

    // Security configuration
    /// CORS allowed origins (comma-separated list or "*" for all)
    /// Default: None (CORS disabled, same-origin only)
    pub cors_allowed_origins: Option<String>,
    /// Maximum requests per second per IP address
    pub rate_limit_requests_per_second: u32,
    /// Maximum burst size for rate limiting
    pub rate_limit_burst_size: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            xi_api_key: None,
            stt_url: ELEVENLABS_STT_URL.to_string(),
            stt_model_id: DEFAULT_STT_MODEL.to_string(),
            tts_url_template: ELEVENLABS_TTS_URL_TEMPLATE.to_string(),
            tts_model_id: DEFAULT_TTS_MODEL.to_string(),
            default_tts_format: DEFAULT_OUTPUT_FORMAT.to_string(),
            voice_id_empathic: None,
            voice_id_neutral: None,
            voice_id_alert: None,
            voice_id_crisis: None,
            default_voice_id: None,
            n8n_webhook_url: None,
            n8n_internal_token: None,
            http_timeout_seconds: DEFAULT_HTTP_TIMEOUT_SECONDS,
            max_upload_mb: DEFAULT_MAX_UPLOAD_MB,
            ffmpeg_path: None,
            cors_allowed_origins: None,
            rate_limit_requests_per_second: DEFAULT_RATE_LIMIT_RPS,
            rate_limit_burst_size: DEFAULT_RATE_LIMIT_BURST,
        }
    }
}

/// Implement Drop to zeroize all secret fields when ServerConfig is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.xi_api_key {
            key.zeroize();
        }
        if let Some(ref mut token) = self.n8n_internal_token {
            token.zeroize();
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables (and `.env`, loaded by `main`).
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = merge::merge_config(None)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let config = merge::merge_config(Some(yaml_config))?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that would otherwise only fail on first use.
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        validation::validate_http_url("ELEVEN_STT_URL", &self.stt_url)?;
        validation::validate_tts_template(&self.tts_url_template)?;
        if let Some(url) = &self.n8n_webhook_url {
            validation::validate_http_url("N8N_WEBHOOK_URL", url)?;
        }
        validation::validate_positive("HTTP_TIMEOUT_S", self.http_timeout_seconds)?;
        validation::validate_positive("MAX_UPLOAD_MB", self.max_upload_mb)?;
        Ok(())
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Maximum utterance/upload size in bytes
    pub fn max_upload_bytes(&self) -> usize {
        usize::try_from(self.max_upload_mb.saturating_mul(1024 * 1024)).unwrap_or(usize::MAX)
    }

    /// Timeout for outbound provider calls
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }

    /// Whether per-IP rate limiting is switched off
    pub fn is_rate_limiting_disabled(&self) -> bool {
        self.rate_limit_requests_per_second >= RATE_LIMIT_DISABLED_THRESHOLD
    }

    pub fn voice_table(&self) -> VoiceTable {
        let voice = |v: &Option<String>| v.clone().unwrap_or_default();
        VoiceTable {
            empathic: voice(&self.voice_id_empathic),
            neutral: voice(&self.voice_id_neutral),
            alert: voice(&self.voice_id_alert),
            crisis: voice(&self.voice_id_crisis),
            default_voice: voice(&self.default_voice_id),
        }
    }

    pub fn stt_config(&self) -> ElevenLabsSTTConfig {
        ElevenLabsSTTConfig {
            api_key: self.xi_api_key.clone().unwrap_or_default(),
            url: self.stt_url.clone(),
            model_id: self.stt_model_id.clone(),
            max_audio_bytes: self.max_upload_bytes(),
        }
    }

    pub fn tts_config(&self) -> ElevenLabsTTSConfig {
        ElevenLabsTTSConfig {
            api_key: self.xi_api_key.clone().unwrap_or_default(),
            url_template: self.tts_url_template.clone(),
            model_id: self.tts_model_id.clone(),
            default_format: self.default_tts_format.clone(),
            voices: self.voice_table(),
        }
    }

    pub fn webhook_config(&self) -> WebhookConfig {
        WebhookConfig {
            url: self.n8n_webhook_url.clone(),
            internal_token: self.n8n_internal_token.clone(),
        }
    }
}
