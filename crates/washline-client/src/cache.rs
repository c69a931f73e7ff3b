//! Client-side notification cache.
//!
//! A soft cache: the store is authoritative and replaces this wholesale on
//! every reconcile. Live pushes only patch it in between.

use std::collections::VecDeque;
use washline_core::Notification;

#[derive(Debug, Clone)]
pub struct ClientCache {
    /// Most-recent-first.
    notifications: VecDeque<Notification>,
    unread: u64,
    limit: usize,
}

impl ClientCache {
    pub fn new(limit: usize) -> Self {
        Self {
            notifications: VecDeque::new(),
            unread: 0,
            limit: limit.max(1),
        }
    }

    pub fn unread(&self) -> u64 {
        self.unread
    }

    pub fn notifications(&self) -> impl Iterator<Item = &Notification> {
        self.notifications.iter()
    }

    pub fn len(&self) -> usize {
        self.notifications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty()
    }

    /// Apply a live push. Returns `false` for a duplicate already in the cache.
    pub fn apply_push(&mut self, notification: Notification) -> bool {
        if self.notifications.iter().any(|n| n.id == notification.id) {
            return false;
        }
        self.notifications.push_front(notification);
        self.notifications.truncate(self.limit);
        self.unread += 1;
        true
    }

    pub fn set_unread(&mut self, count: u64) {
        self.unread = count;
    }

    /// Replace everything with a fresh read from the store.
    pub fn replace(&mut self, recent: Vec<Notification>, unread: u64) {
        self.notifications = recent.into_iter().take(self.limit).collect();
        self.unread = unread;
    }

    pub fn clear(&mut self) {
        self.notifications.clear();
        self.unread = 0;
    }
}
