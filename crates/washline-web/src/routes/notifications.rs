//! Notification read API used by clients to reconcile with the store.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use washline_core::Notification;

use super::error_response;
use crate::state::AppState;

const DEFAULT_LIMIT: usize = 20;
const MAX_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub user_id: String,
    pub limit: Option<usize>,
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    pub user_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CountResponse {
    pub count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdatedResponse {
    pub updated: u64,
}

pub async fn list_notifications(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Notification>>, (StatusCode, String)> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let list = state
        .store
        .list_recent(&query.user_id, limit, query.unread_only)
        .await
        .map_err(error_response)?;
    Ok(Json(list))
}

pub async fn unread_count(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<CountResponse>, (StatusCode, String)> {
    let count = state
        .store
        .unread_count(&query.user_id)
        .await
        .map_err(error_response)?;
    // Refresh the cache only for users it tracks.
    if state.registry.contains_user(&query.user_id) {
        state.counts.set(&query.user_id, count);
    }
    Ok(Json(CountResponse { count }))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Notification>, (StatusCode, String)> {
    let notification = state.store.mark_read(&id).await.map_err(error_response)?;
    // The write is persisted; a failed push only leaves clients to reconcile.
    match state.refresh_count(&notification.user_id).await {
        Ok(count) => {
            debug!(id = %id, user_id = %notification.user_id, count, "Notification marked read")
        }
        Err(e) => warn!(
            id = %id,
            user_id = %notification.user_id,
            error = %e,
            "Marked read but unread count refresh failed"
        ),
    }
    Ok(Json(notification))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<UpdatedResponse>, (StatusCode, String)> {
    let updated = state
        .store
        .mark_all_read(&query.user_id)
        .await
        .map_err(error_response)?;
    if let Err(e) = state.refresh_count(&query.user_id).await {
        warn!(
            user_id = %query.user_id,
            error = %e,
            "Marked all read but unread count refresh failed"
        );
    }
    debug!(user_id = %query.user_id, updated, "All notifications marked read");
    Ok(Json(UpdatedResponse { updated }))
}
