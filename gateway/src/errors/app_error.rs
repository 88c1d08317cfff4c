use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::core::orchestration::OrchestrationError;
use crate::core::stt::STTError;
use crate::core::transcode::TranscodeError;
use crate::core::tts::TTSError;

/// Error returned by the synchronous HTTP endpoints
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing credential, endpoint or voice
    #[error("{0}")]
    Configuration(String),

    /// Empty, oversized or unconvertible input
    #[error("{0}")]
    BadRequest(String),

    /// Required form field absent
    #[error("{0}")]
    MissingField(String),

    /// Upstream provider answered with a non-success status
    #[error("{message}")]
    Upstream { status: u16, message: String },

    /// Upstream unreachable or answered with something unusable
    #[error("{0}")]
    BadGateway(String),

    #[error("{0}")]
    GatewayTimeout(String),
}

/// Result type for HTTP handlers
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::MissingField(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            AppError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            AppError::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "Request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<TranscodeError> for AppError {
    fn from(e: TranscodeError) -> Self {
        AppError::BadRequest(format!("WAV conversion failed: {e}"))
    }
}

impl From<STTError> for AppError {
    fn from(e: STTError) -> Self {
        match e {
            STTError::ConfigurationError(msg) => AppError::Configuration(msg),
            STTError::AudioProcessingError(msg) => AppError::BadRequest(msg),
            STTError::EmptyTranscript => {
                AppError::BadRequest("No transcript text produced".to_string())
            }
            STTError::ProviderError { status, message } => AppError::Upstream { status, message },
            STTError::InvalidResponse(_) => {
                AppError::BadGateway("Invalid STT provider response".to_string())
            }
            STTError::NetworkError(msg) => AppError::BadGateway(msg),
            STTError::Timeout(msg) => AppError::GatewayTimeout(msg),
        }
    }
}

impl From<OrchestrationError> for AppError {
    fn from(e: OrchestrationError) -> Self {
        match e {
            OrchestrationError::MissingEndpoint => AppError::Configuration(e.to_string()),
            OrchestrationError::UpstreamStatus { status, message } => AppError::Upstream {
                status,
                message: format!("n8n error: {message}"),
            },
            OrchestrationError::NetworkError(msg) => AppError::BadGateway(msg),
            OrchestrationError::Timeout(msg) => AppError::GatewayTimeout(msg),
        }
    }
}

impl From<TTSError> for AppError {
    fn from(e: TTSError) -> Self {
        match e {
            TTSError::InvalidConfiguration(msg) => AppError::Configuration(msg),
            TTSError::EmptyText => AppError::BadRequest(e.to_string()),
            TTSError::ProviderError { status, message } => AppError::Upstream { status, message },
            TTSError::NetworkError(msg) => AppError::BadGateway(msg),
            TTSError::Timeout(msg) => AppError::GatewayTimeout(msg),
        }
    }
}

impl From<axum::extract::multipart::MultipartError> for AppError {
    fn from(e: axum::extract::multipart::MultipartError) -> Self {
        AppError::BadRequest(format!("Invalid multipart body: {}", e.body_text()))
    }
}
