//! `NotificationStore` implementation over Redis.

use async_trait::async_trait;
use washline_core::{NewNotification, Notification, NotificationStore, WashlineError, WashlineResult};

use crate::client::{RedisError, RedisPool};
use crate::queries::notifications as queries;

/// Redis-backed notification store.
#[derive(Clone)]
pub struct RedisNotificationStore {
    pool: RedisPool,
}

impl RedisNotificationStore {
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }
}

fn to_core(err: RedisError) -> WashlineError {
    match err {
        RedisError::NotFound(msg) => WashlineError::NotificationNotFound(msg),
        other => WashlineError::store(other.to_string()),
    }
}

#[async_trait]
impl NotificationStore for RedisNotificationStore {
    async fn create(&self, new: NewNotification) -> WashlineResult<Notification> {
        let notification = Notification::from_new(new)?;
        queries::insert_notification(&self.pool, &notification)
            .await
            .map_err(to_core)?;
        tracing::debug!(
            id = %notification.id,
            user_id = %notification.user_id,
            "Notification stored"
        );
        Ok(notification)
    }

    async fn list_recent(
        &self,
        user_id: &str,
        limit: usize,
        unread_only: bool,
    ) -> WashlineResult<Vec<Notification>> {
        queries::list_recent(&self.pool, user_id, limit, unread_only)
            .await
            .map_err(to_core)
    }

    async fn unread_count(&self, user_id: &str) -> WashlineResult<u64> {
        queries::unread_count(&self.pool, user_id)
            .await
            .map_err(to_core)
    }

    async fn mark_read(&self, notification_id: &str) -> WashlineResult<Notification> {
        let (row, _changed) = queries::mark_read(&self.pool, notification_id)
            .await
            .map_err(to_core)?;
        Ok(row)
    }

    async fn mark_all_read(&self, user_id: &str) -> WashlineResult<u64> {
        queries::mark_all_read(&self.pool, user_id)
            .await
            .map_err(to_core)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_core_not_found() {
        let err = to_core(RedisError::NotFound("n1".to_string()));
        assert!(matches!(err, WashlineError::NotificationNotFound(_)));
        assert!(err.is_client_error());
    }
}
