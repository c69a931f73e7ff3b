//! Notification dispatcher: fans one payload out to all of a user's connections.
//!
//! Dispatch never waits on a peer. Frames go into each connection's bounded
//! queue with `try_send`; the connection's writer task drains its own queue in
//! order, so one slow socket cannot hold up the others.

use axum::extract::ws::Message;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};
use washline_core::{Notification, ServerMessage};

use crate::counts::UnreadCounts;
use crate::registry::{CloseReason, ConnectionRegistry};

#[derive(Clone)]
pub struct Dispatcher {
    registry: ConnectionRegistry,
    counts: UnreadCounts,
}

impl Dispatcher {
    pub fn new(registry: ConnectionRegistry, counts: UnreadCounts) -> Self {
        Self { registry, counts }
    }

    /// Deliver `message` to every open connection of `user_id`.
    ///
    /// Fire and forget: nothing is queued for users with no open connection,
    /// and per-connection failures are handled here rather than reported.
    pub fn dispatch(&self, user_id: &str, message: &ServerMessage) {
        let handles = self.registry.connections_for(user_id);
        if handles.is_empty() {
            debug!(user_id = %user_id, "No open connections, push skipped");
            return;
        }

        let text = match message.encode() {
            Ok(text) => text,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Failed to encode push message");
                return;
            }
        };
        let frame = Message::Text(text.into());

        let mut delivered = 0usize;
        let mut failed = 0usize;
        for handle in handles {
            match handle.try_send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Closed(_)) => {
                    failed += 1;
                    debug!(
                        user_id = %user_id,
                        connection_id = handle.id(),
                        "Connection already closed, removing"
                    );
                    self.registry.unregister(user_id, handle.id());
                }
                Err(TrySendError::Full(_)) => {
                    // Slow consumer. The client reconciles after reconnecting.
                    failed += 1;
                    warn!(
                        user_id = %user_id,
                        connection_id = handle.id(),
                        "Outbound queue full, evicting connection"
                    );
                    handle.close(CloseReason::SLOW_CONSUMER);
                    self.registry.unregister(user_id, handle.id());
                }
            }
        }
        debug!(user_id = %user_id, delivered, failed, "Push dispatched");
    }

    /// Push a freshly persisted notification and bump the cached unread count.
    ///
    /// Offline users get neither a push nor a cache entry.
    pub fn push_notification(&self, notification: &Notification) {
        if self.registry.contains_user(&notification.user_id) {
            self.counts.increment(&notification.user_id);
        }
        self.dispatch(&notification.user_id, &ServerMessage::from(notification));
    }

    /// Push a count-only update and remember it while the user is online.
    pub fn push_count(&self, user_id: &str, count: u64) {
        if self.registry.contains_user(user_id) {
            self.counts.set(user_id, count);
        }
        self.dispatch(user_id, &ServerMessage::count(count));
    }
}
