mod base;
pub mod elevenlabs;

pub use base::{AudioInput, STTError, STTResult, Transcriber};
pub use elevenlabs::{DEFAULT_STT_MODEL, ELEVENLABS_STT_URL, ElevenLabsSTT, ElevenLabsSTTConfig};
