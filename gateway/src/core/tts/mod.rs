mod base;
pub mod elevenlabs;
pub mod voices;

pub use base::{
    AudioStream, SpeechSynthesizer, SynthesisRequest, SynthesisStream, SynthesizedAudio, TTSError,
    TTSResult,
};
pub use elevenlabs::{
    DEFAULT_OUTPUT_FORMAT, DEFAULT_TTS_MODEL, ELEVENLABS_TTS_URL_TEMPLATE, ElevenLabsTTS,
    ElevenLabsTTSConfig,
};
pub use voices::{VoiceTable, media_type_for_format};
