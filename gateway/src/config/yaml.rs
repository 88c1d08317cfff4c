use serde::Deserialize;
use std::path::PathBuf;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present in the
/// file take priority over environment variables.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 8000
///
/// providers:
///   xi_api_key: "your-elevenlabs-key"
///   stt_url: "https://api.elevenlabs.io/v1/speech-to-text"
///   stt_model_id: "scribe_v2"
///   tts_url_template: "https://api.elevenlabs.io/v1/text-to-speech/{voice_id}"
///   tts_model_id: "eleven_multilingual_v2"
///   default_tts_format: "mp3_44100_128"
///
/// voices:
///   empathic: "voice-a"
///   neutral: "voice-b"
///   alert: "voice-c"
///   crisis: "voice-d"
///   default: "voice-b"
///
/// orchestration:
///   webhook_url: "https://n8n.example.com/webhook/chat"
///   internal_token: "shared-secret"
///
/// limits:
///   http_timeout_seconds: 30
///   max_upload_mb: 10
///
/// transcoder:
///   ffmpeg_path: "/usr/bin/ffmpeg"
///
/// security:
///   cors_allowed_origins: "https://app.example.com"
///   rate_limit_requests_per_second: 60
///   rate_limit_burst_size: 10
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub providers: Option<ProvidersYaml>,
    pub voices: Option<VoicesYaml>,
    pub orchestration: Option<OrchestrationYaml>,
    pub limits: Option<LimitsYaml>,
    pub transcoder: Option<TranscoderYaml>,
    pub security: Option<SecurityYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Speech provider settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ProvidersYaml {
    /// ElevenLabs API key, shared by transcription and synthesis
    pub xi_api_key: Option<String>,
    pub stt_url: Option<String>,
    pub stt_model_id: Option<String>,
    /// Must contain `{voice_id}`
    pub tts_url_template: Option<String>,
    pub tts_model_id: Option<String>,
    pub default_tts_format: Option<String>,
}

/// Per-category voice identifiers from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct VoicesYaml {
    pub empathic: Option<String>,
    pub neutral: Option<String>,
    pub alert: Option<String>,
    pub crisis: Option<String>,
    #[serde(rename = "default")]
    pub default_voice: Option<String>,
}

/// Orchestration webhook settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct OrchestrationYaml {
    pub webhook_url: Option<String>,
    pub internal_token: Option<String>,
}

/// Request limits from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LimitsYaml {
    /// Timeout applied to every outbound provider call
    pub http_timeout_seconds: Option<u64>,
    /// Maximum utterance/upload size in megabytes
    pub max_upload_mb: Option<u64>,
}

/// External transcoder settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TranscoderYaml {
    pub ffmpeg_path: Option<String>,
}

/// Security configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SecurityYaml {
    /// CORS allowed origins (comma-separated list or "*" for all)
    pub cors_allowed_origins: Option<String>,
    /// Maximum requests per second per IP address
    pub rate_limit_requests_per_second: Option<u32>,
    /// Maximum burst size for rate limiting
    pub rate_limit_burst_size: Option<u32>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if:
    /// - The file cannot be read
    /// - The YAML is malformed
    /// - Fields have invalid types
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_yaml_config_full() {
        let yaml = r#"
server:
  host: "127.0.0.1"
  port: 8080

providers:
  xi_api_key: "xi-key"
  stt_model_id: "scribe_v1"
  tts_url_template: "https://tts.example.com/{voice_id}"

voices:
  neutral: "voice-neutral"
  default: "voice-default"

orchestration:
  webhook_url: "https://n8n.example.com/webhook/chat"
  internal_token: "token"

limits:
  http_timeout_seconds: 15
  max_upload_mb: 5

transcoder:
  ffmpeg_path: "/opt/bin/ffmpeg"

security:
  cors_allowed_origins: "*"
  rate_limit_requests_per_second: 100
"#;

        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();

        let server = config.server.as_ref().unwrap();
        assert_eq!(server.host, Some("127.0.0.1".to_string()));
        assert_eq!(server.port, Some(8080));

        let providers = config.providers.as_ref().unwrap();
        assert_eq!(providers.xi_api_key, Some("xi-key".to_string()));
        assert_eq!(providers.stt_model_id, Some("scribe_v1".to_string()));
        assert!(providers.tts_model_id.is_none());

        let voices = config.voices.as_ref().unwrap();
        assert_eq!(voices.neutral, Some("voice-neutral".to_string()));
        assert_eq!(voices.default_voice, Some("voice-default".to_string()));
        assert!(voices.crisis.is_none());

        assert_eq!(
            config.orchestration.as_ref().unwrap().webhook_url,
            Some("https://n8n.example.com/webhook/chat".to_string())
        );
        assert_eq!(config.limits.as_ref().unwrap().max_upload_mb, Some(5));
        assert_eq!(
            config.transcoder.as_ref().unwrap().ffmpeg_path,
            Some("/opt/bin/ffmpeg".to_string())
        );
        assert_eq!(
            config.security.as_ref().unwrap().rate_limit_requests_per_second,
            Some(100)
        );
    }

    #[test]
    fn test_yaml_config_empty() {
        let config: YamlConfig = serde_yaml::from_str("{}").unwrap();
        assert!(config.server.is_none());
        assert!(config.providers.is_none());
        assert!(config.voices.is_none());
    }

    #[test]
    fn test_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        fs::write(&config_path, "server:\n  port: 3000\n").unwrap();

        let config = YamlConfig::from_file(&config_path).unwrap();
        assert_eq!(config.server.as_ref().unwrap().port, Some(3000));
    }

    #[test]
    fn test_from_file_not_found() {
        let path = PathBuf::from("/nonexistent/config.yaml");
        let result = YamlConfig::from_file(&path);
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }

    #[test]
    fn test_from_file_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("invalid.yaml");
        fs::write(&config_path, "invalid: yaml: content:").unwrap();

        let result = YamlConfig::from_file(&config_path);
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse YAML")
        );
    }
}
