//! Voice selection and output media types.

/// Per-category voice identifiers plus a global default.
///
/// Empty strings mean "not configured".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceTable {
    pub empathic: String,
    pub neutral: String,
    pub alert: String,
    pub crisis: String,
    pub default_voice: String,
}

impl VoiceTable {
    /// Voice configured for a response category, if any
    pub fn for_category(&self, response_type: &str) -> Option<&str> {
        let voice = match response_type.trim().to_ascii_lowercase().as_str() {
            "empathic" => &self.empathic,
            "neutral" => &self.neutral,
            "alert" => &self.alert,
            "crisis" => &self.crisis,
            _ => return None,
        };
        Some(voice.trim()).filter(|v| !v.is_empty())
    }

    /// Resolve the voice for a request.
    ///
    /// An explicit voice wins, then the category voice, then the default.
    /// Returns `None` when nothing is configured.
    pub fn resolve(&self, explicit: Option<&str>, response_type: Option<&str>) -> Option<String> {
        explicit
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .or_else(|| response_type.and_then(|t| self.for_category(t)))
            .or_else(|| Some(self.default_voice.trim()).filter(|v| !v.is_empty()))
            .map(str::to_string)
    }
}

/// Media type for an output format such as `mp3_44100_128`.
pub fn media_type_for_format(format: &str) -> &'static str {
    let format = format.trim().to_ascii_lowercase();
    let family = format.split('_').next().unwrap_or_default();
    match family {
        "ogg" => "audio/ogg",
        "wav" => "audio/wav",
        _ => "audio/mpeg",
    }
}
