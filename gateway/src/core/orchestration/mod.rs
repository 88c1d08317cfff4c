//! Dialogue orchestration: transcript in, structured response out.

pub mod normalize;
pub mod safety;
mod webhook;

use async_trait::async_trait;
use thiserror::Error;

pub use normalize::{NormalizedResponse, OrchestrationResult, normalize_body};
pub use safety::{
    FallbackKind, HARD_BLOCK_CRISIS_MESSAGE, STANDARD_CRISIS_MESSAGE, apply_fallback, is_crisis,
};
pub use webhook::{WebhookConfig, WebhookOrchestrator};

/// Error types for orchestration calls
#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error("N8N_WEBHOOK_URL is not configured")]
    MissingEndpoint,

    #[error("Orchestration error ({status}): {message}")]
    UpstreamStatus { status: u16, message: String },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timed out: {0}")]
    Timeout(String),
}

impl From<reqwest::Error> for OrchestrationError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            OrchestrationError::Timeout(e.to_string())
        } else {
            OrchestrationError::NetworkError(e.to_string())
        }
    }
}

/// Result type for orchestration calls
pub type OrchestratorResult<T> = Result<T, OrchestrationError>;

/// Dialogue backend.
#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Send one transcript and return the normalized response.
    async fn forward(&self, session_id: &str, text: &str) -> OrchestratorResult<NormalizedResponse>;
}
