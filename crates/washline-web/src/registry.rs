//! Connection registry: tracks every open live-push connection per user.
//!
//! A user may hold any number of connections (tabs, devices). A user id is
//! present as a key only while at least one of its connections is open; the
//! entry is dropped in the same critical section that removes the last one.

use axum::extract::ws::Message;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Process-unique connection identifier.
pub type ConnectionId = u64;

/// Why the server is closing a connection, sent as the WebSocket close frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CloseReason {
    pub code: u16,
    pub reason: &'static str,
}

impl CloseReason {
    /// Outbound queue overflowed; the client should reconnect and reconcile.
    pub const SLOW_CONSUMER: Self = Self {
        code: 1013,
        reason: "slow consumer",
    };
    pub const SHUTDOWN: Self = Self {
        code: 1001,
        reason: "server shutting down",
    };
}

/// Sending side of one connection's outbound queue.
///
/// Cloning is cheap; the registry and the connection actor each hold one.
#[derive(Clone, Debug)]
pub struct ConnectionHandle {
    id: ConnectionId,
    tx: mpsc::Sender<Message>,
    close_tx: Arc<watch::Sender<Option<CloseReason>>>,
}

impl ConnectionHandle {
    /// Create a handle together with the queue receiver and close signal the
    /// connection's writer consumes.
    pub fn channel(
        id: ConnectionId,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<Message>, watch::Receiver<Option<CloseReason>>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let (close_tx, close_rx) = watch::channel(None);
        let handle = Self {
            id,
            tx,
            close_tx: Arc::new(close_tx),
        };
        (handle, rx, close_rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue a frame without waiting on the peer.
    pub fn try_send(&self, msg: Message) -> Result<(), mpsc::error::TrySendError<Message>> {
        self.tx.try_send(msg)
    }

    /// Ask the connection's writer to close the socket.
    pub fn close(&self, reason: CloseReason) {
        self.close_tx.send_replace(Some(reason));
    }
}

/// Concurrent map from user id to that user's open connections.
///
/// Constructed once by the server and shared through `AppState`; tests build
/// their own.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    inner: Arc<DashMap<String, HashMap<ConnectionId, ConnectionHandle>>>,
    next_id: Arc<AtomicU64>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new connection handle. It is not registered yet.
    pub fn open_connection(
        &self,
        capacity: usize,
    ) -> (
        ConnectionHandle,
        mpsc::Receiver<Message>,
        watch::Receiver<Option<CloseReason>>,
    ) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        ConnectionHandle::channel(id, capacity)
    }

    /// Add a connection to the user's set, creating the set if needed.
    pub fn register(&self, user_id: &str, handle: ConnectionHandle) {
        let count = {
            let mut set = self.inner.entry(user_id.to_string()).or_default();
            set.insert(handle.id(), handle);
            set.len()
        };
        tracing::debug!(user_id = %user_id, connections = count, "Connection registered");
    }

    /// Remove a connection. Returns `false` if it was not registered.
    ///
    /// Removing an unknown or already-removed connection is a no-op.
    pub fn unregister(&self, user_id: &str, id: ConnectionId) -> bool {
        let (removed, remaining) = match self.inner.entry(user_id.to_string()) {
            Entry::Occupied(mut entry) => {
                let removed = entry.get_mut().remove(&id).is_some();
                let remaining = entry.get().len();
                if remaining == 0 {
                    entry.remove();
                }
                (removed, remaining)
            }
            Entry::Vacant(_) => (false, 0),
        };
        if removed {
            tracing::debug!(
                user_id = %user_id,
                connection_id = id,
                remaining,
                "Connection unregistered"
            );
        }
        removed
    }

    /// Snapshot of the user's connections. Empty if the user has none.
    ///
    /// The shard lock is released before this returns, so callers can write
    /// to the handles without blocking registry mutations.
    pub fn connections_for(&self, user_id: &str) -> Vec<ConnectionHandle> {
        self.inner
            .get(user_id)
            .map(|set| set.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn connection_count(&self, user_id: &str) -> usize {
        self.inner.get(user_id).map(|set| set.len()).unwrap_or(0)
    }

    pub fn contains_user(&self, user_id: &str) -> bool {
        self.inner.contains_key(user_id)
    }

    /// Number of users with at least one open connection.
    pub fn user_count(&self) -> usize {
        self.inner.len()
    }

    /// Ask every open connection to close. Used on server shutdown; each
    /// connection unregisters itself as it exits.
    pub fn close_all(&self, reason: CloseReason) {
        for entry in self.inner.iter() {
            for handle in entry.value().values() {
                handle.close(reason);
            }
        }
    }

    #[cfg(test)]
    fn has_empty_entry(&self) -> bool {
        self.inner.iter().any(|entry| entry.value().is_empty())
    }
}
