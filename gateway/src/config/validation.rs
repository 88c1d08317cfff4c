use url::Url;

/// Validate that an endpoint is an absolute http(s) URL.
pub fn validate_http_url(name: &str, value: &str) -> Result<(), Box<dyn std::error::Error>> {
    let parsed = Url::parse(value).map_err(|e| format!("{name} is not a valid URL: {e}"))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(format!("{name} must use http or https, got '{scheme}'").into()),
    }
}

/// Validate the synthesis URL template.
///
/// The template must contain the `{voice_id}` placeholder and be a valid URL once
/// the placeholder is filled.
pub fn validate_tts_template(template: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !template.contains("{voice_id}") {
        return Err("ELEVEN_TTS_URL_TMPL must contain the {voice_id} placeholder".into());
    }
    validate_http_url(
        "ELEVEN_TTS_URL_TMPL",
        &template.replace("{voice_id}", "voice"),
    )
}

/// Validate that a numeric limit is positive.
pub fn validate_positive(name: &str, value: u64) -> Result<(), Box<dyn std::error::Error>> {
    if value == 0 {
        return Err(format!("{name} must be greater than zero").into());
    }
    Ok(())
}
