//! Application state.

use std::sync::Arc;
use washline_core::{NewNotification, Notification, NotificationStore, WashlineResult};

use crate::config::ServerConfig;
use crate::counts::UnreadCounts;
use crate::dispatch::Dispatcher;
use crate::registry::ConnectionRegistry;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn NotificationStore>,
    pub registry: ConnectionRegistry,
    pub counts: UnreadCounts,
    pub dispatcher: Dispatcher,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn NotificationStore>, config: ServerConfig) -> Self {
        let registry = ConnectionRegistry::new();
        let counts = UnreadCounts::new();
        let dispatcher = Dispatcher::new(registry.clone(), counts.clone());
        Self {
            store,
            registry,
            counts,
            dispatcher,
            config: Arc::new(config),
        }
    }

    /// Persist a notification, then push it live.
    ///
    /// The store write comes first so a client reconciling after the push
    /// always finds the record.
    pub async fn publish(&self, new: NewNotification) -> WashlineResult<Notification> {
        let notification = self.store.create(new).await?;
        self.dispatcher.push_notification(&notification);
        Ok(notification)
    }

    /// Re-read the unread count from the store and push it to the user.
    pub async fn refresh_count(&self, user_id: &str) -> WashlineResult<u64> {
        let count = self.store.unread_count(user_id).await?;
        self.dispatcher.push_count(user_id, count);
        Ok(count)
    }
}
