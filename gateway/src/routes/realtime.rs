//! Realtime WebSocket route configuration

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::realtime::realtime_handler;
use crate::state::AppState;
use std::sync::Arc;

/// Create the Realtime WebSocket router
///
/// # Endpoint
///
/// `GET /rt/chat` - WebSocket upgrade for utterance-based voice sessions
///
/// # Example
///
/// ```json
/// // Client starts an utterance
/// {"type": "start", "session_id": "abc", "language": "id", "content_type": "audio/webm"}
/// // Server responds
/// {"event": "ready"}
///
/// // Client sends audio as binary frames, then
/// {"type": "stop"}
///
/// // Server streams the reply
/// {"event": "audio_start", "media_type": "audio/mpeg", "type": "neutral"}
/// // ... binary audio frames ...
/// {"event": "audio_end"}
/// {"event": "ready"}
/// ```
pub fn create_realtime_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/rt/chat", get(realtime_handler))
        .layer(TraceLayer::new_for_http())
}
