//! Container detection from magic bytes.
//!
//! Browsers and mobile recorders routinely mislabel their uploads (a WebM
//! blob declared as `audio/ogg`, an MP3 sent as `application/octet-stream`),
//! so the declared content type is only a hint. The signatures here are the
//! first bytes of each container.

/// Audio containers the transcoder knows how to name explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioContainer {
    /// RIFF/WAVE, the canonical container for transcription
    Wav,
    /// Ogg (Opus or Vorbis)
    Ogg,
    /// MPEG audio, with or without an ID3 tag
    Mpeg,
    /// WebM / Matroska (EBML)
    Webm,
}

impl AudioContainer {
    /// Canonical MIME type for the container
    pub fn mime_type(&self) -> &'static str {
        match self {
            AudioContainer::Wav => "audio/wav",
            AudioContainer::Ogg => "audio/ogg",
            AudioContainer::Mpeg => "audio/mpeg",
            AudioContainer::Webm => "audio/webm",
        }
    }

    /// Demuxer name understood by `ffmpeg -f`
    pub fn demuxer(&self) -> &'static str {
        match self {
            AudioContainer::Wav => "wav",
            AudioContainer::Ogg => "ogg",
            AudioContainer::Mpeg => "mp3",
            AudioContainer::Webm => "webm",
        }
    }

    /// File extension used for the scratch input file
    pub fn extension(&self) -> &'static str {
        match self {
            AudioContainer::Wav => "wav",
            AudioContainer::Ogg => "ogg",
            AudioContainer::Mpeg => "mp3",
            AudioContainer::Webm => "webm",
        }
    }

    /// Map a declared content type onto a container.
    ///
    /// Parameters (`; codecs=opus`) and case are ignored. Unknown types map to `None`.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match essence(mime).as_str() {
            "audio/wav" | "audio/x-wav" | "audio/wave" => Some(AudioContainer::Wav),
            "audio/ogg" => Some(AudioContainer::Ogg),
            "audio/mpeg" | "audio/mp3" => Some(AudioContainer::Mpeg),
            "audio/webm" => Some(AudioContainer::Webm),
            _ => None,
        }
    }
}

/// Lower-cased media type without parameters.
pub fn essence(mime: &str) -> String {
    mime.split(';').next().unwrap_or_default().trim().to_ascii_lowercase()
}

/// True when the declared type already names the canonical PCM container.
pub fn is_canonical(mime: &str) -> bool {
    AudioContainer::from_mime(mime) == Some(AudioContainer::Wav)
}

const EBML_MAGIC: [u8; 4] = [0x1A, 0x45, 0xDF, 0xA3];

/// Best-effort container sniffing.
///
/// Returns `None` for anything shorter than four bytes or without a known signature.
pub fn sniff(data: &[u8]) -> Option<AudioContainer> {
    if data.len() < 4 {
        return None;
    }

    let head = &data[..4];
    if head == b"RIFF" {
        return Some(AudioContainer::Wav);
    }
    if head == b"OggS" {
        return Some(AudioContainer::Ogg);
    }
    // ID3v2 tag, or a bare MPEG frame sync (11 set bits)
    if &data[..3] == b"ID3" || (data[0] == 0xFF && (data[1] & 0xE0) == 0xE0) {
        return Some(AudioContainer::Mpeg);
    }
    if head == EBML_MAGIC {
        return Some(AudioContainer::Webm);
    }
    None
}
