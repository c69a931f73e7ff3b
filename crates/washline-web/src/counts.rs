//! Server-side unread count cache.
//!
//! Best effort only. The store is authoritative and overwrites this on every
//! handshake or explicit refresh. Entries exist only for users with an open
//! connection; callers check the registry before writing.

use dashmap::DashMap;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct UnreadCounts {
    inner: Arc<DashMap<String, u64>>,
}

impl UnreadCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, user_id: &str) -> u64 {
        self.inner.get(user_id).map(|c| *c).unwrap_or(0)
    }

    /// Overwrite with a value read from the store.
    pub fn set(&self, user_id: &str, count: u64) {
        self.inner.insert(user_id.to_string(), count);
    }

    pub fn increment(&self, user_id: &str) -> u64 {
        let mut count = self.inner.entry(user_id.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn forget(&self, user_id: &str) {
        self.inner.remove(user_id);
    }

    /// Number of users with a cached count.
    pub fn tracked_users(&self) -> usize {
        self.inner.len()
    }
}
