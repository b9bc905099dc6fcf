//! Per-call WebSocket session lifecycle.
//!
//! Each inbound Twilio media-stream connection gets exactly one session:
//! the handler opens a companion OpenAI realtime connection, then drives a
//! single `select!` loop over both sockets until either side ends. There
//! is no shared state between sessions and no retry on either socket.

use super::{
    openai,
    relay::{Action, RelaySession},
};
use crate::state::AppState;
use anyhow::{Context, Result};
use async_openai::types::realtime::ServerEvent;
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use std::{sync::Arc, time::Duration};
use tokio::time::sleep;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tracing::{debug, error, info, instrument, warn};
use twilio_media::StreamEvent;
use uuid::Uuid;

/// Delay before the one-time session configuration message. The realtime
/// endpoint rejects a `session.update` sent in the same instant the socket
/// opens; no acknowledgment is awaited and forwarding is never blocked on
/// this timer.
const SESSION_UPDATE_DELAY: Duration = Duration::from_millis(250);

type TwilioSink = SplitSink<WebSocket, Message>;
type OpenAiSink = SplitSink<openai::RealtimeStream, WsMessage>;

/// Axum handler to upgrade an HTTP connection to a media-stream WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Entry point for one call session.
#[instrument(name = "call_session", skip_all, fields(session_id))]
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let session_id = Uuid::new_v4();
    tracing::Span::current().record("session_id", session_id.to_string().as_str());
    info!("Twilio media stream connected");

    // One realtime connection per session, opened at creation and never
    // re-opened. On failure the inbound socket is simply dropped.
    let realtime_stream = match openai::connect(&state.config).await {
        Ok(stream) => stream,
        Err(e) => {
            error!(error = ?e, "Could not open the realtime voice channel");
            return;
        }
    };

    if let Err(e) = run_relay(socket, realtime_stream, &state).await {
        error!(error = ?e, "Relay session ended with error");
    }
    info!("Call session finished");
}

/// The main event loop for an active call session.
async fn run_relay(
    socket: WebSocket,
    realtime_stream: openai::RealtimeStream,
    state: &Arc<AppState>,
) -> Result<()> {
    let (mut twilio_tx, mut twilio_rx) = socket.split();
    let (mut openai_tx, mut openai_rx) = realtime_stream.split();
    let mut session = RelaySession::new();

    let config_delay = sleep(SESSION_UPDATE_DELAY);
    tokio::pin!(config_delay);
    let mut configured = false;

    // The loop result is captured so every exit, error or not, falls
    // through to the teardown below.
    let outcome: Result<()> = async {
        loop {
            tokio::select! {
                _ = &mut config_delay, if !configured => {
                    configured = true;
                    let payload = openai::session_update(&state.config)?;
                    openai_tx
                        .send(WsMessage::Text(payload.to_string().into()))
                        .await
                        .context("Failed to send session configuration")?;
                    info!("Realtime session configuration sent");
                }
                msg = twilio_rx.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            match serde_json::from_str::<StreamEvent>(&text) {
                                Ok(event) => {
                                    let stopping = matches!(event, StreamEvent::Stop);
                                    let actions = session.on_twilio_event(event);
                                    dispatch(actions, &mut twilio_tx, &mut openai_tx).await?;
                                    if stopping {
                                        break;
                                    }
                                }
                                Err(e) => warn!(error = %e, "Discarding malformed message from Twilio"),
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            info!("Twilio closed the media stream");
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            error!(error = %e, "Twilio socket error");
                            break;
                        }
                    }
                }
                msg = openai_rx.next() => {
                    match msg {
                        Some(Ok(WsMessage::Text(text))) => {
                            match serde_json::from_str::<ServerEvent>(&text) {
                                Ok(event) => {
                                    let actions = session.on_openai_event(event);
                                    dispatch(actions, &mut twilio_tx, &mut openai_tx).await?;
                                }
                                Err(e) => debug!(error = %e, "Ignoring unrecognized realtime event"),
                            }
                        }
                        Some(Ok(WsMessage::Close(_))) | None => {
                            info!("Realtime channel closed");
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            error!(error = %e, "Realtime socket error");
                            break;
                        }
                    }
                }
            }
        }
        Ok(())
    }
    .await;

    // Symmetric teardown: whichever side is still open gets closed here,
    // on the error path too; close frames to an already-closed peer are
    // harmless.
    let _ = openai_tx.send(WsMessage::Close(None)).await;
    let _ = twilio_tx.send(Message::Close(None)).await;
    outcome
}

/// Serializes and sends the frames produced by one relay step.
async fn dispatch(
    actions: Vec<Action>,
    twilio_tx: &mut TwilioSink,
    openai_tx: &mut OpenAiSink,
) -> Result<()> {
    for action in actions {
        match action {
            Action::ToTwilio(frame) => twilio_tx
                .send(Message::Text(serde_json::to_string(&frame)?.into()))
                .await
                .context("Failed to forward frame to Twilio")?,
            Action::ToOpenAi(event) => openai_tx
                .send(WsMessage::Text(serde_json::to_string(&event)?.into()))
                .await
                .context("Failed to forward event to OpenAI")?,
        }
    }
    Ok(())
}
