//! Notification queries against Redis.
//!
//! Layout per user:
//! - `washline:{user}:notification:{id}` hash, field `data` holds the JSON record
//! - `washline:{user}:notifications:all` sorted set of ids scored by creation millis
//! - `washline:{user}:notifications:unread` set of unread ids
//! - `washline:notification-owner:{id}` string holding the owning user id

use std::collections::HashSet;

use crate::client::{RedisError, RedisPool, RedisResult};
use redis::AsyncCommands;
use washline_core::Notification;

pub(crate) fn record_key(user_id: &str, id: &str) -> String {
    format!("washline:{}:notification:{}", user_id, id)
}

pub(crate) fn all_key(user_id: &str) -> String {
    format!("washline:{}:notifications:all", user_id)
}

pub(crate) fn unread_key(user_id: &str) -> String {
    format!("washline:{}:notifications:unread", user_id)
}

pub(crate) fn owner_key(id: &str) -> String {
    format!("washline:notification-owner:{}", id)
}

/// Ids are opaque to callers but must never carry key or glob syntax.
fn check_id(id: &str) -> RedisResult<()> {
    if id.is_empty() || id.contains(['*', '?', '[', ']', '\\', ':']) {
        return Err(RedisError::NotFound(id.to_string()));
    }
    Ok(())
}

pub async fn insert_notification(pool: &RedisPool, row: &Notification) -> RedisResult<()> {
    let mut conn = pool.clone();
    let key = record_key(&row.user_id, &row.id);
    conn.hset::<_, _, _, ()>(&key, "data", serde_json::to_string(row)?)
        .await?;
    conn.set::<_, _, ()>(&owner_key(&row.id), &row.user_id).await?;

    conn.zadd::<_, _, _, ()>(&all_key(&row.user_id), &row.id, row.created_at.timestamp_millis())
        .await?;
    if !row.read {
        conn.sadd::<_, _, ()>(&unread_key(&row.user_id), &row.id).await?;
    }
    Ok(())
}

async fn load(pool: &RedisPool, key: &str) -> RedisResult<Option<Notification>> {
    let mut conn = pool.clone();
    let json: Option<String> = conn.hget(key, "data").await?;
    match json {
        Some(j) => Ok(Some(serde_json::from_str(&j)?)),
        None => Ok(None),
    }
}

pub async fn get_notification(pool: &RedisPool, notification_id: &str) -> RedisResult<Notification> {
    check_id(notification_id)?;
    let mut conn = pool.clone();
    let owner: Option<String> = conn.get(owner_key(notification_id)).await?;
    if let Some(user_id) = owner {
        if let Some(row) = load(pool, &record_key(&user_id, notification_id)).await? {
            return Ok(row);
        }
    }
    Err(RedisError::NotFound(notification_id.to_string()))
}

pub async fn list_recent(
    pool: &RedisPool,
    user_id: &str,
    limit: usize,
    unread_only: bool,
) -> RedisResult<Vec<Notification>> {
    let mut conn = pool.clone();
    let ids: Vec<String> = conn.zrevrange(&all_key(user_id), 0, -1).await?;
    let unread: Option<HashSet<String>> = if unread_only {
        Some(conn.smembers(&unread_key(user_id)).await?)
    } else {
        None
    };

    let mut rows = Vec::new();
    for id in ids {
        if rows.len() >= limit {
            break;
        }
        if let Some(unread) = &unread {
            if !unread.contains(&id) {
                continue;
            }
        }
        if let Some(row) = load(pool, &record_key(user_id, &id)).await? {
            rows.push(row);
        }
    }
    Ok(rows)
}

pub async fn unread_count(pool: &RedisPool, user_id: &str) -> RedisResult<u64> {
    let mut conn = pool.clone();
    let count: u64 = conn.scard(&unread_key(user_id)).await?;
    Ok(count)
}

/// Flip the read flag. Returns the stored row and whether it changed.
pub async fn mark_read(pool: &RedisPool, notification_id: &str) -> RedisResult<(Notification, bool)> {
    let mut row = get_notification(pool, notification_id).await?;
    let changed = row.mark_read();
    if changed {
        let mut conn = pool.clone();
        conn.hset::<_, _, _, ()>(
            &record_key(&row.user_id, &row.id),
            "data",
            serde_json::to_string(&row)?,
        )
        .await?;
    }
    let mut conn = pool.clone();
    conn.srem::<_, _, ()>(&unread_key(&row.user_id), &row.id).await?;
    Ok((row, changed))
}

pub async fn mark_all_read(pool: &RedisPool, user_id: &str) -> RedisResult<u64> {
    let mut conn = pool.clone();
    let ids: Vec<String> = conn.smembers(&unread_key(user_id)).await?;
    let mut changed = 0;
    for id in ids {
        let key = record_key(user_id, &id);
        if let Some(mut row) = load(pool, &key).await? {
            if row.mark_read() {
                let mut c = pool.clone();
                c.hset::<_, _, _, ()>(&key, "data", serde_json::to_string(&row)?)
                    .await?;
                changed += 1;
            }
        }
        let mut c = pool.clone();
        c.srem::<_, _, ()>(&unread_key(user_id), &id).await?;
    }
    Ok(changed)
}
