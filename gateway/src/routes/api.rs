use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::{api, speech};
use crate::state::AppState;
use std::sync::Arc;

/// Allowance for multipart boundaries and the non-file fields
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Create the REST router: probes and the synchronous speech endpoints
///
/// Upload bodies are capped at `max_upload_bytes` plus multipart overhead.
pub fn create_api_router(max_upload_bytes: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route("/healthz", get(api::health_check))
        .route("/readyz", get(api::readiness_check))
        .route("/stt", post(speech::stt_handler))
        .route("/stt-chat", post(speech::stt_chat_handler))
        .route("/tts/stt-chat-tts", post(speech::stt_chat_tts_handler))
        .route(
            "/tts/stt-chat-tts-stream",
            post(speech::stt_chat_tts_stream_handler),
        )
        .layer(DefaultBodyLimit::max(
            max_upload_bytes + MULTIPART_OVERHEAD_BYTES,
        ))
        .layer(TraceLayer::new_for_http())
}
