//! WebSocket upgrade endpoint.
//!
//! `GET /ws?userId=<id>`. The identity is trusted as already authenticated
//! upstream; this handler only checks that one is present.

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, CloseFrame, Message, WebSocketUpgrade},
        Query, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::actor;
use crate::state::AppState;

/// Close code sent when the upgrade request carries no identity (policy violation).
pub const CLOSE_MISSING_IDENTITY: u16 = 1008;
pub const MISSING_IDENTITY_REASON: &str = "missing required identity";

/// Query parameters for a WebSocket connection.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

impl WsQuery {
    /// The identity, if present and non-blank.
    pub fn identity(&self) -> Option<String> {
        self.user_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
    }
}

/// GET /ws?userId=ID
///
/// Non-upgrade requests get the same 405 as other verbs. Upgrades without an
/// identity are accepted and then closed immediately with 1008, so browsers
/// see a proper close code instead of a failed handshake.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(params): Query<WsQuery>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => {
            warn!(reason = %rejection.body_text(), "Rejected non-upgrade request on /ws");
            return method_not_allowed().await.into_response();
        }
    };

    match params.identity() {
        Some(user_id) => {
            info!(user_id = %user_id, "WebSocket upgrade accepted");
            ws.on_upgrade(move |socket| actor::run_connection(socket, state, user_id))
        }
        None => {
            warn!(
                close_code = CLOSE_MISSING_IDENTITY,
                "WebSocket upgrade without userId, closing"
            );
            ws.on_upgrade(|mut socket| async move {
                let close_frame = CloseFrame {
                    code: CLOSE_MISSING_IDENTITY,
                    reason: MISSING_IDENTITY_REASON.into(),
                };
                let _ = socket.send(Message::Close(Some(close_frame))).await;
            })
        }
    }
}

/// Anything but a GET upgrade on the upgrade path.
pub async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "GET"), (header::UPGRADE, "websocket")],
        "Only GET with a WebSocket upgrade is allowed on this endpoint",
    )
}
