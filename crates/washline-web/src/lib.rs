//! Washline Web Server
//!
//! Axum-based live-push server: WebSocket upgrade endpoint, per-user
//! connection registry, dispatcher, and the notification read API clients use
//! to reconcile with the store.

pub mod actor;
pub mod config;
pub mod counts;
pub mod dispatch;
pub mod registry;
pub mod routes;
pub mod state;
pub mod websocket;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use washline_core::NotificationStore;

pub use config::ServerConfig;
pub use registry::{CloseReason, ConnectionRegistry};
pub use state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/notifications", get(routes::notifications::list_notifications))
        .route(
            "/notifications/unread-count",
            get(routes::notifications::unread_count),
        )
        .route(
            "/notifications/read-all",
            post(routes::notifications::mark_all_read),
        )
        .route(
            "/notifications/{id}/read",
            post(routes::notifications::mark_read),
        )
        .with_state(state.clone());

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest("/api", api_routes)
        .route(
            "/ws",
            get(websocket::ws_upgrade).fallback(websocket::method_not_allowed),
        )
        .route("/internal/notify", post(routes::internal::notify))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve on an already bound listener until `shutdown` resolves.
///
/// On shutdown every open connection is sent a going-away close frame.
pub async fn serve<F>(
    listener: tokio::net::TcpListener,
    state: AppState,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let registry = state.registry.clone();
    let app = create_router(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            tracing::info!(
                users = registry.user_count(),
                "Shutting down, closing live connections"
            );
            registry.close_all(CloseReason::SHUTDOWN);
        })
        .await?;
    Ok(())
}

/// Run the web server until Ctrl+C.
pub async fn run_server(
    store: Arc<dyn NotificationStore>,
    config: ServerConfig,
) -> anyhow::Result<()> {
    let addr = config.bind_addr();
    let state = AppState::new(store, config);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Web server listening on http://{}", addr);

    serve(listener, state, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}
