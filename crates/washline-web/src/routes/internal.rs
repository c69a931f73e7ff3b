//! Internal notification endpoint for business-event producers.

use axum::{extract::State, http::StatusCode, Json};
use tracing::info;
use washline_core::{NewNotification, Notification};

use super::error_response;
use crate::state::AppState;

/// Persist a notification and push it to the user's open connections.
pub async fn notify(
    State(state): State<AppState>,
    Json(new): Json<NewNotification>,
) -> Result<(StatusCode, Json<Notification>), (StatusCode, String)> {
    let notification = state.publish(new).await.map_err(error_response)?;
    info!(
        id = %notification.id,
        user_id = %notification.user_id,
        category = %notification.category,
        connections = state.registry.connection_count(&notification.user_id),
        "Notification published"
    );
    Ok((StatusCode::CREATED, Json(notification)))
}
