use super::ServerConfig;
use super::env;
use super::yaml::YamlConfig;
use crate::core::stt::{DEFAULT_STT_MODEL, ELEVENLABS_STT_URL};
use crate::core::tts::{DEFAULT_OUTPUT_FORMAT, DEFAULT_TTS_MODEL, ELEVENLABS_TTS_URL_TEMPLATE};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_MAX_UPLOAD_MB: u64 = 10;
pub const DEFAULT_RATE_LIMIT_RPS: u32 = 60;
pub const DEFAULT_RATE_LIMIT_BURST: u32 = 10;

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Build the final configuration: YAML values over environment values over defaults.
pub fn merge_config(yaml: Option<YamlConfig>) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let yaml = yaml.unwrap_or_default();
    let server = yaml.server.unwrap_or_default();
    let providers = yaml.providers.unwrap_or_default();
    let voices = yaml.voices.unwrap_or_default();
    let orchestration = yaml.orchestration.unwrap_or_default();
    let limits = yaml.limits.unwrap_or_default();
    let transcoder = yaml.transcoder.unwrap_or_default();
    let security = yaml.security.unwrap_or_default();

    let string = |yaml_value: Option<String>, key: &str| non_blank(yaml_value).or_else(|| env::string(key));

    Ok(ServerConfig {
        host: string(server.host, env::HOST).unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port: match server.port {
            Some(port) => port,
            None => env::parse(env::PORT)?.unwrap_or(DEFAULT_PORT),
        },

        xi_api_key: string(providers.xi_api_key, env::XI_API_KEY),
        stt_url: string(providers.stt_url, env::ELEVEN_STT_URL)
            .unwrap_or_else(|| ELEVENLABS_STT_URL.to_string()),
        stt_model_id: string(providers.stt_model_id, env::ELEVEN_STT_MODEL_ID)
            .unwrap_or_else(|| DEFAULT_STT_MODEL.to_string()),
        tts_url_template: string(providers.tts_url_template, env::ELEVEN_TTS_URL_TMPL)
            .unwrap_or_else(|| ELEVENLABS_TTS_URL_TEMPLATE.to_string()),
        tts_model_id: string(providers.tts_model_id, env::ELEVEN_TTS_MODEL_ID)
            .unwrap_or_else(|| DEFAULT_TTS_MODEL.to_string()),
        default_tts_format: string(providers.default_tts_format, env::DEFAULT_TTS_FORMAT)
            .unwrap_or_else(|| DEFAULT_OUTPUT_FORMAT.to_string()),

        voice_id_empathic: string(voices.empathic, env::VOICE_ID_EMPATHIC),
        voice_id_neutral: string(voices.neutral, env::VOICE_ID_NEUTRAL),
        voice_id_alert: string(voices.alert, env::VOICE_ID_ALERT),
        voice_id_crisis: string(voices.crisis, env::VOICE_ID_CRISIS),
        default_voice_id: string(voices.default_voice, env::DEFAULT_VOICE_ID),

        n8n_webhook_url: string(orchestration.webhook_url, env::N8N_WEBHOOK_URL),
        n8n_internal_token: string(orchestration.internal_token, env::N8N_INTERNAL_TOKEN),

        http_timeout_seconds: match limits.http_timeout_seconds {
            Some(value) => value,
            None => env::parse(env::HTTP_TIMEOUT_S)?.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECONDS),
        },
        max_upload_mb: match limits.max_upload_mb {
            Some(value) => value,
            None => env::parse(env::MAX_UPLOAD_MB)?.unwrap_or(DEFAULT_MAX_UPLOAD_MB),
        },

        ffmpeg_path: non_blank(transcoder.ffmpeg_path)
            .or_else(|| env::first_of(&[env::FFMPEG_PATH, env::FFMPEG_BIN])),

        cors_allowed_origins: string(security.cors_allowed_origins, env::CORS_ORIGINS),
        rate_limit_requests_per_second: match security.rate_limit_requests_per_second {
            Some(value) => value,
            None => env::parse(env::RATE_LIMIT_RPS)?.unwrap_or(DEFAULT_RATE_LIMIT_RPS),
        },
        rate_limit_burst_size: match security.rate_limit_burst_size {
            Some(value) => value,
            None => env::parse(env::RATE_LIMIT_BURST)?.unwrap_or(DEFAULT_RATE_LIMIT_BURST),
        },
    })
}
