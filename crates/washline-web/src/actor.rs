//! Per-connection lifecycle.
//!
//! Each upgraded socket is split into a writer task that owns the sink and a
//! reader loop that owns the stream:
//! - writer: drains the connection's outbound queue in order, pings, honours
//!   close requests, and gives every write a deadline
//! - reader: handles client hints and close frames, and detects idle peers
//!
//! Whichever side stops first ends the connection, and the connection is then
//! unregistered exactly once.

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, info, warn};
use washline_core::{ClientMessage, ServerMessage};

use crate::registry::CloseReason;
use crate::state::AppState;

/// Run an accepted connection for `user_id` until it closes.
pub async fn run_connection(socket: WebSocket, state: AppState, user_id: String) {
    let (ws_sender, mut ws_receiver) = socket.split();
    let (handle, rx, close_rx) = state
        .registry
        .open_connection(state.config.queue_capacity);
    let connection_id = handle.id();

    // Handshake: best known count. The store wins; the cache covers store outages.
    let stored = state.store.unread_count(&user_id).await;
    let count = match &stored {
        Ok(count) => *count,
        Err(e) => {
            warn!(user_id = %user_id, error = %e, "Unread count unavailable, using cached value");
            state.counts.get(&user_id)
        }
    };
    // Queued before registering so it is always the first frame.
    match ServerMessage::connected(count).encode() {
        Ok(text) => {
            if handle.try_send(Message::Text(text.into())).is_err() {
                warn!(user_id = %user_id, connection_id, "Handshake could not be queued");
            }
        }
        Err(e) => warn!(user_id = %user_id, error = %e, "Failed to encode handshake"),
    }

    state.registry.register(&user_id, handle);
    if stored.is_ok() {
        state.counts.set(&user_id, count);
    }

    info!(user_id = %user_id, connection_id, count, "WebSocket connection opened");

    let mut writer = tokio::spawn(writer_task(
        ws_sender,
        rx,
        close_rx,
        state.config.write_timeout,
        state.config.ping_interval,
    ));

    let idle = state.config.idle_timeout();
    loop {
        let next = tokio::select! {
            next = timeout(idle, ws_receiver.next()) => next,
            _ = &mut writer => {
                debug!(user_id = %user_id, connection_id, "Writer stopped");
                break;
            }
        };

        match next {
            Ok(Some(Ok(msg))) => match msg {
                Message::Text(text) => handle_client_text(&state, &user_id, text.as_str()),
                Message::Binary(_) => {
                    debug!(user_id = %user_id, "Ignoring binary frame");
                }
                // Pings are answered by the transport.
                Message::Ping(_) | Message::Pong(_) => {}
                Message::Close(frame) => {
                    info!(user_id = %user_id, connection_id, reason = ?frame, "Client initiated close");
                    break;
                }
            },
            Ok(Some(Err(e))) => {
                warn!(user_id = %user_id, connection_id, error = %e, "WebSocket receive error");
                break;
            }
            Ok(None) => {
                debug!(user_id = %user_id, connection_id, "WebSocket stream ended");
                break;
            }
            Err(_) => {
                warn!(user_id = %user_id, connection_id, "Peer idle past timeout, closing");
                break;
            }
        }
    }

    writer.abort();
    state.registry.unregister(&user_id, connection_id);
    if !state.registry.contains_user(&user_id) {
        state.counts.forget(&user_id);
    }

    info!(user_id = %user_id, connection_id, "WebSocket connection closed");
}

/// Apply a client → server message. Malformed input is logged and dropped.
fn handle_client_text(state: &AppState, user_id: &str, text: &str) {
    match ClientMessage::decode(text) {
        Ok(ClientMessage::MarkAsRead) => {
            debug!(user_id = %user_id, "markAsRead hint received");
            // Cache hint only; other tabs of the same user get the reset too.
            state.dispatcher.push_count(user_id, 0);
        }
        Err(e) => {
            warn!(
                user_id = %user_id,
                error = %e,
                message = %text.chars().take(100).collect::<String>(),
                "Dropping malformed client message"
            );
        }
    }
}

/// Writer task: forwards queued frames to the socket, one deadline per write.
async fn writer_task(
    mut ws_sender: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Message>,
    mut close_rx: watch::Receiver<Option<CloseReason>>,
    write_timeout: Duration,
    ping_interval: Duration,
) {
    let mut ping = interval(ping_interval);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // Skip the first immediate tick
    ping.tick().await;

    loop {
        let msg = tokio::select! {
            biased;
            changed = close_rx.changed() => {
                let reason = if changed.is_ok() { *close_rx.borrow() } else { None };
                if let Some(reason) = reason {
                    let frame = CloseFrame {
                        code: reason.code,
                        reason: reason.reason.into(),
                    };
                    let _ = timeout(write_timeout, ws_sender.send(Message::Close(Some(frame)))).await;
                }
                break;
            }
            msg = rx.recv() => match msg {
                Some(msg) => msg,
                None => break,
            },
            _ = ping.tick() => Message::Ping(Default::default()),
        };

        match timeout(write_timeout, ws_sender.send(msg)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                debug!(error = %e, "WebSocket send failed, client disconnected");
                break;
            }
            Err(_) => {
                warn!(timeout_ms = write_timeout.as_millis() as u64, "WebSocket write timed out");
                break;
            }
        }
    }
}
