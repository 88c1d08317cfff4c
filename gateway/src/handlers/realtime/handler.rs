//! Realtime WebSocket handler
//!
//! Bridges one WebSocket connection to a [`RealtimeSession`]. Frames keep being
//! read while an utterance is processed, so a disconnect can abort the in-flight
//! pipeline; other frames received meanwhile go to a bounded [`Backlog`] and are
//! handled afterwards.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::future::BoxFuture;
use futures::{FutureExt, SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::{select, time::Duration};
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::state::AppState;

use super::backlog::{Backlog, Queued};
use super::messages::{SessionEvent, SessionRoute, detail};
use super::session::{ChannelClosed, FrameOutcome, RealtimeSession, Utterance, process_utterance};

/// Outgoing channel capacity; synthesized audio chunks queue here
const CHANNEL_BUFFER_SIZE: usize = 1024;

/// Maximum WebSocket frame size (10 MB)
const MAX_WS_FRAME_SIZE: usize = 10 * 1024 * 1024;

/// Maximum WebSocket message size (10 MB)
const MAX_WS_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

/// How often the connection is checked for inactivity
const IDLE_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Connections without frames for this long are closed
const IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Time allowed for queued events to reach the client on shutdown
const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// Realtime WebSocket handler
///
/// Upgrades the HTTP connection to WebSocket for the utterance protocol.
pub async fn realtime_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    let connection_id = Uuid::new_v4();
    info!(%connection_id, "Realtime WebSocket connection upgrade requested");

    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| {
            handle_realtime_socket(socket, state)
                .instrument(info_span!("realtime", %connection_id))
        })
}

/// What woke the connection loop
enum Wake {
    Frame(Option<Result<Message, axum::Error>>),
    Processed(bool),
    IdleCheck,
}

/// What to do with a frame once the session has seen it
#[derive(Debug)]
enum FrameStep {
    Continue,
    Process(Utterance),
    Close,
}

async fn handle_realtime_socket(socket: WebSocket, app_state: Arc<AppState>) {
    info!("Realtime WebSocket connection established");

    let (mut sender, mut receiver) = socket.split();
    let (message_tx, mut message_rx) = mpsc::channel::<SessionRoute>(CHANNEL_BUFFER_SIZE);

    // Sender task for outgoing messages
    let mut sender_task = tokio::spawn(async move {
        while let Some(route) = message_rx.recv().await {
            let should_close = matches!(route, SessionRoute::Close);

            let result = match route {
                SessionRoute::Event(event) => match serde_json::to_string(&event) {
                    Ok(json_str) => sender.send(Message::Text(json_str.into())).await,
                    Err(e) => {
                        error!("Failed to serialize session event: {}", e);
                        continue;
                    }
                },
                SessionRoute::Audio(data) => sender.send(Message::Binary(data)).await,
                SessionRoute::Close => {
                    info!("Closing realtime WebSocket connection");
                    sender.send(Message::Close(None)).await
                }
            };

            if let Err(e) = result {
                debug!("Failed to send WebSocket message: {}", e);
                break;
            }

            if should_close {
                break;
            }
        }
    });

    let mut session = RealtimeSession::new(message_tx.clone(), app_state.config.max_upload_bytes());
    let mut backlog = Backlog::new(app_state.config.max_upload_bytes());
    let mut in_flight: Option<BoxFuture<'static, bool>> = None;
    let mut last_activity = Instant::now();
    let mut close_gracefully = false;

    'connection: loop {
        // Frames queued during processing run once the session is free again
        while in_flight.is_none() {
            let msg = match backlog.pop() {
                Some(Queued::Frame(msg)) => msg,
                Some(Queued::Overflow) => {
                    session.mark_overflow();
                    continue;
                }
                None => break,
            };
            match handle_frame(msg, &mut session).await {
                Ok(FrameStep::Continue) => {}
                Ok(FrameStep::Process(utterance)) => {
                    in_flight = Some(
                        process_utterance(
                            app_state.pipeline.clone(),
                            message_tx.clone(),
                            utterance,
                        )
                        .boxed(),
                    );
                }
                Ok(FrameStep::Close) => break 'connection,
                Err(ChannelClosed) => break 'connection,
            }
        }

        let wake = select! {
            msg = receiver.next() => Wake::Frame(msg),
            keep = async {
                match in_flight.as_mut() {
                    Some(run) => run.await,
                    None => std::future::pending().await,
                }
            }, if in_flight.is_some() => Wake::Processed(keep),
            _ = tokio::time::sleep(IDLE_CHECK_INTERVAL) => Wake::IdleCheck,
        };

        match wake {
            Wake::Frame(Some(Ok(Message::Close(_)))) => {
                info!("Realtime WebSocket close received");
                break;
            }
            Wake::Frame(Some(Ok(Message::Ping(_) | Message::Pong(_)))) => {
                last_activity = Instant::now();
            }
            Wake::Frame(Some(Ok(msg))) => {
                last_activity = Instant::now();
                if backlog.push(msg).is_err() {
                    warn!(
                        queued = backlog.len(),
                        queued_audio_bytes = backlog.audio_bytes(),
                        "Too many frames queued behind the in-flight utterance, closing"
                    );
                    let _ = message_tx
                        .send(SessionRoute::Event(SessionEvent::error(
                            detail::BACKLOG_EXCEEDED,
                        )))
                        .await;
                    close_gracefully = true;
                    break;
                }
            }
            Wake::Frame(Some(Err(e))) => {
                warn!("Realtime WebSocket error: {}", e);
                break;
            }
            Wake::Frame(None) => {
                info!("Realtime WebSocket connection closed by client");
                break;
            }
            Wake::Processed(keep) => {
                in_flight = None;
                session.finish_processing();
                last_activity = Instant::now();
                if !keep {
                    close_gracefully = true;
                    break;
                }
            }
            Wake::IdleCheck => {
                if in_flight.is_none() && last_activity.elapsed() > IDLE_TIMEOUT {
                    warn!(
                        "Realtime WebSocket connection idle for {}s, closing stale connection",
                        last_activity.elapsed().as_secs()
                    );
                    let _ = message_tx
                        .send(SessionRoute::Event(SessionEvent::error(detail::IDLE_TIMEOUT)))
                        .await;
                    close_gracefully = true;
                    break;
                }
                debug!("Realtime WebSocket connection idle check - still active");
            }
        }
    }

    // Dropping the in-flight future abandons the pipeline and kills any transcoder child
    if in_flight.take().is_some() {
        info!("Abandoned in-flight utterance");
    }
    session.close();

    if close_gracefully {
        let _ = message_tx.send(SessionRoute::Close).await;
    }
    drop(session);
    drop(message_tx);
    if tokio::time::timeout(FLUSH_TIMEOUT, &mut sender_task)
        .await
        .is_err()
    {
        sender_task.abort();
    }

    info!("Realtime WebSocket connection terminated");
}

/// Feed one frame to the session.
async fn handle_frame(msg: Message, session: &mut RealtimeSession) -> Result<FrameStep, ChannelClosed> {
    match msg {
        Message::Text(text) => {
            debug!("Received text frame: {} bytes", text.len());
            match session.handle_text(text.as_str()).await? {
                FrameOutcome::Continue => Ok(FrameStep::Continue),
                FrameOutcome::Process(utterance) => Ok(FrameStep::Process(utterance)),
            }
        }
        Message::Binary(data) => {
            debug!("Received binary audio: {} bytes", data.len());
            session.handle_binary(&data);
            Ok(FrameStep::Continue)
        }
        Message::Ping(_) | Message::Pong(_) => Ok(FrameStep::Continue),
        Message::Close(_) => Ok(FrameStep::Close),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::realtime::session::SessionState;
    use bytes::Bytes;

    #[tokio::test]
    async fn test_handle_frame_routes_binary_and_control() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut session = RealtimeSession::new(tx, 1024);

        let step = handle_frame(Message::Text(r#"{"type":"start"}"#.into()), &mut session)
            .await
            .unwrap();
        assert!(matches!(step, FrameStep::Continue));
        assert!(matches!(
            rx.try_recv(),
            Ok(SessionRoute::Event(SessionEvent::Ready))
        ));

        handle_frame(Message::Binary(Bytes::from_static(b"abcd")), &mut session)
            .await
            .unwrap();
        assert_eq!(session.buffered_bytes(), 4);

        let step = handle_frame(Message::Ping(Bytes::new()), &mut session)
            .await
            .unwrap();
        assert!(matches!(step, FrameStep::Continue));

        let step = handle_frame(Message::Text(r#"{"type":"stop"}"#.into()), &mut session)
            .await
            .unwrap();
        assert!(matches!(step, FrameStep::Process(ref u) if u.audio.len() == 4));
        assert_eq!(session.state(), SessionState::Processing);

        let step = handle_frame(Message::Close(None), &mut session)
            .await
            .unwrap();
        assert!(matches!(step, FrameStep::Close));
    }
}
