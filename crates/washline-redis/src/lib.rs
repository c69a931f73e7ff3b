//! Washline Redis Data Layer
//!
//! Durable notification store backed by Redis.

pub mod client;
pub mod queries;
pub mod store;

pub use client::{
    init_pool, RedisError, RedisPool, RedisResult, DEFAULT_REDIS_URL,
};
pub use queries::notifications;
pub use store::RedisNotificationStore;
