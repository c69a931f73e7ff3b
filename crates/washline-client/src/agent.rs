//! Reconnecting live-push agent.
//!
//! One background task per signed-in user. It holds at most one connection,
//! and when that connection drops for any reason it waits the configured
//! delay and tries again, indefinitely, until `logout`.

use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use washline_core::{Category, ClientMessage, Notification, ServerMessage};

use crate::cache::ClientCache;
use crate::config::AgentConfig;
use crate::error::AgentResult;
use crate::store_client::StoreClient;

const EVENT_CAPACITY: usize = 64;

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// What the agent reports to the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    /// Handshake received with the server's best-known count.
    Connected { count: u64 },
    /// Cache rebuilt from the store.
    Reconciled { unread: u64 },
    /// Transient alert for a newly pushed notification.
    Alert {
        title: String,
        message: String,
        category: Category,
    },
    CountChanged(u64),
    Disconnected,
    Reconnecting { attempt: u64, delay: Duration },
}

enum SessionEnd {
    Closed,
    Shutdown,
}

/// Background worker; created through [`NotificationAgent::start`].
pub struct NotificationAgent {
    url: String,
    user_id: String,
    config: AgentConfig,
    store: Arc<dyn StoreClient>,
    cache: Arc<RwLock<ClientCache>>,
    events: mpsc::Sender<AgentEvent>,
    outbound: mpsc::UnboundedReceiver<ClientMessage>,
    shutdown: watch::Receiver<bool>,
}

impl NotificationAgent {
    /// Spawn the agent for `user_id`. Must be called inside a tokio runtime.
    pub fn start(
        config: AgentConfig,
        user_id: impl Into<String>,
        store: Arc<dyn StoreClient>,
    ) -> AgentResult<AgentHandle> {
        let user_id = user_id.into();
        let url = config.connect_url(&user_id)?;
        let cache = Arc::new(RwLock::new(ClientCache::new(config.history_limit)));
        let (events_tx, events_rx) = mpsc::channel(EVENT_CAPACITY);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let agent = Self {
            url,
            user_id: user_id.clone(),
            config,
            store,
            cache: cache.clone(),
            events: events_tx,
            outbound: outbound_rx,
            shutdown: shutdown_rx,
        };
        let task = tokio::spawn(agent.run());

        Ok(AgentHandle {
            user_id,
            cache,
            events: events_rx,
            outbound: outbound_tx,
            shutdown: shutdown_tx,
            task,
        })
    }

    async fn run(mut self) {
        let mut failures: u64 = 0;
        loop {
            if *self.shutdown.borrow() {
                break;
            }

            debug!(user_id = %self.user_id, url = %self.url, "Connecting");
            let attempt = tokio::select! {
                result = connect_async(self.url.as_str()) => Some(result),
                _ = self.shutdown.changed() => None,
            };
            let Some(result) = attempt else { break };

            match result {
                Ok((ws, _)) => {
                    failures = 0;
                    info!(user_id = %self.user_id, "Live connection open");
                    if let SessionEnd::Shutdown = self.session(ws).await {
                        break;
                    }
                    info!(user_id = %self.user_id, "Live connection lost");
                    self.emit(AgentEvent::Disconnected);
                }
                Err(e) => {
                    failures += 1;
                    warn!(user_id = %self.user_id, error = %e, failures, "Connection attempt failed");
                }
            }

            let delay = self.config.reconnect_delay;
            self.emit(AgentEvent::Reconnecting {
                attempt: failures + 1,
                delay,
            });
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.shutdown.changed() => break,
            }
        }

        self.cache.write().await.clear();
        info!(user_id = %self.user_id, "Agent stopped");
    }

    async fn session(&mut self, ws: Ws) -> SessionEnd {
        let (mut sink, mut stream) = ws.split();

        // Hints from while we were offline would override the reconcile.
        let mut stale = 0usize;
        while self.outbound.try_recv().is_ok() {
            stale += 1;
        }
        if stale > 0 {
            debug!(user_id = %self.user_id, stale, "Dropped hints queued while offline");
        }
        loop {
            tokio::select! {
                _ = self.shutdown.changed() => {
                    let _ = sink.send(Message::Close(None)).await;
                    return SessionEnd::Shutdown;
                }
                Some(msg) = self.outbound.recv() => match msg.encode() {
                    Ok(text) => {
                        if let Err(e) = sink.send(Message::text(text)).await {
                            warn!(user_id = %self.user_id, error = %e, "Send failed");
                            return SessionEnd::Closed;
                        }
                    }
                    Err(e) => warn!(error = %e, "Failed to encode client message"),
                },
                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => self.handle_server_text(text.as_str()).await,
                    Some(Ok(Message::Close(frame))) => {
                        debug!(user_id = %self.user_id, reason = ?frame, "Server closed connection");
                        return SessionEnd::Closed;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(user_id = %self.user_id, error = %e, "Receive error");
                        return SessionEnd::Closed;
                    }
                    None => return SessionEnd::Closed,
                },
            }
        }
    }

    async fn handle_server_text(&self, text: &str) {
        match ServerMessage::decode(text) {
            Ok(ServerMessage::Connection { count, .. }) => {
                self.emit(AgentEvent::Connected { count });
                self.reconcile(count).await;
            }
            Ok(msg @ ServerMessage::Notification { .. }) => {
                let Some(notification) = msg.into_notification(&self.user_id) else {
                    return;
                };
                let alert = AgentEvent::Alert {
                    title: notification.title.clone(),
                    message: notification.message.clone(),
                    category: notification.category,
                };
                let (fresh, unread) = {
                    let mut cache = self.cache.write().await;
                    let fresh = cache.apply_push(notification);
                    (fresh, cache.unread())
                };
                if fresh {
                    self.emit(alert);
                    self.emit(AgentEvent::CountChanged(unread));
                }
            }
            Ok(ServerMessage::NotificationCount { count, .. }) => {
                self.cache.write().await.set_unread(count);
                self.emit(AgentEvent::CountChanged(count));
            }
            Err(e) => {
                warn!(
                    user_id = %self.user_id,
                    error = %e,
                    "Dropping malformed server message"
                );
            }
        }
    }

    /// Rebuild the cache from the store. The handshake count is only used
    /// when the store cannot be reached.
    async fn reconcile(&self, handshake_count: u64) {
        let recent = self
            .store
            .list_recent(&self.user_id, self.config.history_limit);
        let unread = self.store.unread_count(&self.user_id);
        match tokio::try_join!(recent, unread) {
            Ok((recent, unread)) => {
                self.cache.write().await.replace(recent, unread);
                debug!(user_id = %self.user_id, unread, "Cache reconciled from store");
                self.emit(AgentEvent::Reconciled { unread });
            }
            Err(e) => {
                warn!(
                    user_id = %self.user_id,
                    error = %e,
                    "Store unreachable, falling back to handshake count"
                );
                self.cache.write().await.set_unread(handshake_count);
                self.emit(AgentEvent::CountChanged(handshake_count));
            }
        }
    }

    fn emit(&self, event: AgentEvent) {
        if self.events.try_send(event).is_err() {
            debug!(user_id = %self.user_id, "Event dropped, receiver busy or gone");
        }
    }
}

/// Control handle for a running agent.
pub struct AgentHandle {
    user_id: String,
    cache: Arc<RwLock<ClientCache>>,
    events: mpsc::Receiver<AgentEvent>,
    outbound: mpsc::UnboundedSender<ClientMessage>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl AgentHandle {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub async fn next_event(&mut self) -> Option<AgentEvent> {
        self.events.recv().await
    }

    pub async fn unread(&self) -> u64 {
        self.cache.read().await.unread()
    }

    /// Cached notifications, most-recent-first.
    pub async fn notifications(&self) -> Vec<Notification> {
        self.cache.read().await.notifications().cloned().collect()
    }

    /// Zero the local count and tell the server to reset its cached count.
    /// Persisted read flags are changed through the store API, not here.
    /// While disconnected the hint is dropped; the next reconcile wins.
    pub async fn mark_as_read(&self) {
        if self.outbound.send(ClientMessage::MarkAsRead).is_err() {
            debug!(user_id = %self.user_id, "Agent stopped, markAsRead not sent");
        }
        self.cache.write().await.set_unread(0);
    }

    /// Close the connection, stop reconnecting and clear the cache.
    pub async fn logout(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!(user_id = %self.user_id, error = %e, "Agent task ended abnormally");
        }
        self.cache.write().await.clear();
        info!(user_id = %self.user_id, "Logged out");
    }
}
