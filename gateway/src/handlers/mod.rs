//! HTTP and WebSocket request handlers
//!
//! This module organizes all API handlers into logical groups:
//! - `api` - Health and readiness probes
//! - `realtime` - Utterance-based voice sessions over WebSocket
//! - `speech` - Synchronous transcription and full-pipeline endpoints

pub mod api;
pub mod realtime;
pub mod speech;

// Re-export commonly used handlers for convenient access
pub use realtime::realtime_handler;
