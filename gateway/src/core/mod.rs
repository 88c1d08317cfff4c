pub mod orchestration;
pub mod pipeline;
pub mod stt;
pub mod text;
pub mod transcode;
pub mod tts;

pub use pipeline::{ReplyPlan, VoicePipeline, plan_reply};
