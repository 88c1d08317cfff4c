pub mod api;
pub mod realtime;

use axum::Router;
use std::sync::Arc;

use crate::state::AppState;

/// Prefix every endpoint is mounted under
pub const API_PREFIX: &str = "/api/v1";

/// Assemble the REST and realtime routers under [`API_PREFIX`].
///
/// Cross-cutting layers (CORS, rate limiting, security headers) are added by the binary.
pub fn create_router(state: Arc<AppState>) -> Router {
    let max_upload_bytes = state.config.max_upload_bytes();
    let routes = api::create_api_router(max_upload_bytes).merge(realtime::create_realtime_router());

    Router::new().nest(API_PREFIX, routes).with_state(state)
}
