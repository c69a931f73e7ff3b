//! Notification store seam.
//!
//! The store is the source of truth for history and unread counts. The live
//! push channel only forwards what the store already holds.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::{WashlineError, WashlineResult};
use crate::model::{NewNotification, Notification};

/// Durable notification persistence.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Persist a new unread notification.
    async fn create(&self, new: NewNotification) -> WashlineResult<Notification>;

    /// Most-recent-first, at most `limit` entries.
    async fn list_recent(
        &self,
        user_id: &str,
        limit: usize,
        unread_only: bool,
    ) -> WashlineResult<Vec<Notification>>;

    async fn unread_count(&self, user_id: &str) -> WashlineResult<u64>;

    /// Mark one notification read and return it.
    async fn mark_read(&self, notification_id: &str) -> WashlineResult<Notification>;

    /// Mark every notification of the user read. Returns how many changed.
    async fn mark_all_read(&self, user_id: &str) -> WashlineResult<u64>;
}

#[derive(Default)]
struct MemoryInner {
    /// Per-user notifications in creation order.
    by_user: HashMap<String, Vec<Notification>>,
    /// notification id -> user id
    owners: HashMap<String, String>,
}

/// In-process store for tests and single-binary demos.
#[derive(Default)]
pub struct MemoryNotificationStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn create(&self, new: NewNotification) -> WashlineResult<Notification> {
        let notification = Notification::from_new(new)?;
        let mut inner = self.inner.write().await;
        inner
            .owners
            .insert(notification.id.clone(), notification.user_id.clone());
        inner
            .by_user
            .entry(notification.user_id.clone())
            .or_default()
            .push(notification.clone());
        Ok(notification)
    }

    async fn list_recent(
        &self,
        user_id: &str,
        limit: usize,
        unread_only: bool,
    ) -> WashlineResult<Vec<Notification>> {
        let inner = self.inner.read().await;
        let Some(list) = inner.by_user.get(user_id) else {
            return Ok(Vec::new());
        };
        Ok(list
            .iter()
            .rev()
            .filter(|n| !unread_only || !n.read)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn unread_count(&self, user_id: &str) -> WashlineResult<u64> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_user
            .get(user_id)
            .map(|list| list.iter().filter(|n| !n.read).count() as u64)
            .unwrap_or(0))
    }

    async fn mark_read(&self, notification_id: &str) -> WashlineResult<Notification> {
        let mut inner = self.inner.write().await;
        let user_id = inner
            .owners
            .get(notification_id)
            .cloned()
            .ok_or_else(|| WashlineError::NotificationNotFound(notification_id.to_string()))?;
        let notification = inner
            .by_user
            .get_mut(&user_id)
            .and_then(|list| list.iter_mut().find(|n| n.id == notification_id))
            .ok_or_else(|| WashlineError::NotificationNotFound(notification_id.to_string()))?;
        notification.mark_read();
        Ok(notification.clone())
    }

    async fn mark_all_read(&self, user_id: &str) -> WashlineResult<u64> {
        let mut inner = self.inner.write().await;
        let changed = inner
            .by_user
            .get_mut(user_id)
            .map(|list| {
                list.iter_mut()
                    .map(|n| n.mark_read())
                    .filter(|changed| *changed)
                    .count() as u64
            })
            .unwrap_or(0);
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;

    fn booking(user: &str, title: &str) -> NewNotification {
        NewNotification::new(user, title, "Your wash is booked", Category::Success)
    }

    #[tokio::test]
    async fn test_list_recent_is_most_recent_first() {
        let store = MemoryNotificationStore::new();
        store.create(booking("u1", "first")).await.unwrap();
        store.create(booking("u1", "second")).await.unwrap();
        store.create(booking("u2", "other")).await.unwrap();

        let list = store.list_recent("u1", 10, false).await.unwrap();
        let titles: Vec<_> = list.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["second", "first"]);

        let limited = store.list_recent("u1", 1, false).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].title, "second");
    }

    #[tokio::test]
    async fn test_unread_count_and_mark_read() {
        let store = MemoryNotificationStore::new();
        let a = store.create(booking("u1", "a")).await.unwrap();
        store.create(booking("u1", "b")).await.unwrap();
        assert_eq!(store.unread_count("u1").await.unwrap(), 2);

        let read = store.mark_read(&a.id).await.unwrap();
        assert!(read.read);
        assert_eq!(store.unread_count("u1").await.unwrap(), 1);

        // Second mark is harmless.
        store.mark_read(&a.id).await.unwrap();
        assert_eq!(store.unread_count("u1").await.unwrap(), 1);

        let unread = store.list_recent("u1", 10, true).await.unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].title, "b");
    }

    #[tokio::test]
    async fn test_mark_all_read() {
        let store = MemoryNotificationStore::new();
        store.create(booking("u1", "a")).await.unwrap();
        store.create(booking("u1", "b")).await.unwrap();
        assert_eq!(store.mark_all_read("u1").await.unwrap(), 2);
        assert_eq!(store.mark_all_read("u1").await.unwrap(), 0);
        assert_eq!(store.unread_count("u1").await.unwrap(), 0);
        assert_eq!(store.mark_all_read("nobody").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_id_and_invalid_create() {
        let store = MemoryNotificationStore::new();
        assert!(matches!(
            store.mark_read("missing").await,
            Err(WashlineError::NotificationNotFound(_))
        ));
        assert!(store.create(booking("", "a")).await.is_err());
        assert_eq!(store.unread_count("").await.unwrap(), 0);
    }
}
