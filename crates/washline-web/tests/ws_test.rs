//! Integration tests for the live-push endpoint: upgrade gating, handshake,
//! fan-out, client hints and deregistration on close.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use washline_core::{
    Category, MemoryNotificationStore, NewNotification, Notification, NotificationStore,
    WashlineError, WashlineResult,
};
use washline_web::{AppState, ServerConfig};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Start the server on a random port and return its address and state.
async fn start_test_server() -> (SocketAddr, AppState) {
    start_server_with(Arc::new(MemoryNotificationStore::new())).await
}

async fn start_server_with(store: Arc<dyn NotificationStore>) -> (SocketAddr, AppState) {
    let state = AppState::new(store, ServerConfig::default());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server_state = state.clone();
    tokio::spawn(async move {
        washline_web::serve(listener, server_state, std::future::pending())
            .await
            .unwrap();
    });

    (addr, state)
}

async fn connect(addr: SocketAddr, user_id: &str) -> Ws {
    let url = format!("ws://{}/ws?userId={}", addr, user_id);
    let (ws, _) = tokio_tungstenite::connect_async(&url)
        .await
        .expect("Failed to connect to WebSocket");
    ws
}

/// Next JSON text frame, skipping control frames.
async fn next_json(ws: &mut Ws) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .expect("websocket error");
        match msg {
            Message::Text(text) => return serde_json::from_str(text.as_str()).unwrap(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {:?}", other),
        }
    }
}

/// Assert nothing arrives for a short while.
async fn assert_silent(ws: &mut Ws) {
    let result = tokio::time::timeout(Duration::from_millis(300), ws.next()).await;
    assert!(result.is_err(), "expected no frame, got {:?}", result);
}

async fn wait_until<F: Fn() -> bool>(cond: F) {
    for _ in 0..100 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not reached");
}

async fn publish(addr: SocketAddr, body: Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("http://{}/internal/notify", addr))
        .json(&body)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_handshake_carries_store_count() {
    let (addr, state) = start_test_server().await;
    for title in ["one", "two"] {
        state
            .store
            .create(NewNotification::new("u1", title, "m", Category::Info))
            .await
            .unwrap();
    }

    let mut ws = connect(addr, "u1").await;
    let hello = next_json(&mut ws).await;
    assert_eq!(hello["type"], "connection");
    assert_eq!(hello["count"], 2);
    assert!(hello["timestamp"].is_string());

    wait_until(|| state.registry.connection_count("u1") == 1).await;
}

#[tokio::test]
async fn test_end_to_end_booking_notification() {
    let (addr, state) = start_test_server().await;
    let mut ws = connect(addr, "u1").await;
    assert_eq!(next_json(&mut ws).await["type"], "connection");

    let response = publish(
        addr,
        json!({
            "userId": "u1",
            "title": "Booking Confirmed",
            "message": "Your wash is booked",
            "category": "success",
            "related": { "kind": "booking", "id": "b-1" }
        }),
    )
    .await;
    assert_eq!(response.status(), 201);

    let pushed = next_json(&mut ws).await;
    assert_eq!(pushed["type"], "notification");
    assert_eq!(pushed["title"], "Booking Confirmed");
    assert_eq!(pushed["message"], "Your wash is booked");
    assert_eq!(pushed["category"], "success");
    assert_eq!(pushed["related"]["id"], "b-1");
    assert_silent(&mut ws).await;

    ws.close(None).await.unwrap();
    wait_until(|| !state.registry.contains_user("u1")).await;

    // Still persisted, just not pushed.
    let response = publish(
        addr,
        json!({ "userId": "u1", "title": "Second", "message": "Later" }),
    )
    .await;
    assert_eq!(response.status(), 201);
    assert_eq!(state.store.unread_count("u1").await.unwrap(), 2);
}

#[tokio::test]
async fn test_fan_out_to_all_tabs_only() {
    let (addr, state) = start_test_server().await;
    let mut tab1 = connect(addr, "u1").await;
    let mut tab2 = connect(addr, "u1").await;
    let mut other = connect(addr, "u2").await;
    for ws in [&mut tab1, &mut tab2, &mut other] {
        assert_eq!(next_json(ws).await["type"], "connection");
    }
    wait_until(|| state.registry.connection_count("u1") == 2).await;

    let response = publish(
        addr,
        json!({ "userId": "u1", "title": "Status", "message": "Wash started", "category": "info" }),
    )
    .await;
    assert_eq!(response.status(), 201);

    assert_eq!(next_json(&mut tab1).await["message"], "Wash started");
    assert_eq!(next_json(&mut tab2).await["message"], "Wash started");
    assert_silent(&mut other).await;
}

#[tokio::test]
async fn test_missing_user_id_is_closed_with_policy_violation() {
    let (addr, state) = start_test_server().await;
    let url = format!("ws://{}/ws", addr);
    let (mut ws, _) = tokio_tungstenite::connect_async(&url).await.unwrap();

    let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    match msg {
        Message::Close(Some(frame)) => {
            assert_eq!(frame.code, CloseCode::Policy);
            assert_eq!(frame.reason.as_str(), "missing required identity");
        }
        other => panic!("expected close frame, got {:?}", other),
    }
    assert_eq!(state.registry.user_count(), 0);
}

#[tokio::test]
async fn test_wrong_method_is_rejected() {
    let (addr, state) = start_test_server().await;
    let response = reqwest::Client::new()
        .post(format!("http://{}/ws?userId=u1", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 405);
    assert_eq!(response.headers()["allow"], "GET");
    assert_eq!(state.registry.user_count(), 0);
}

#[tokio::test]
async fn test_mark_as_read_hint_resets_all_tabs() {
    let (addr, state) = start_test_server().await;
    state
        .store
        .create(NewNotification::new("u1", "t", "m", Category::Info))
        .await
        .unwrap();
    let mut tab1 = connect(addr, "u1").await;
    let mut tab2 = connect(addr, "u1").await;
    assert_eq!(next_json(&mut tab1).await["count"], 1);
    assert_eq!(next_json(&mut tab2).await["count"], 1);
    wait_until(|| state.registry.connection_count("u1") == 2).await;

    tab1.send(Message::text(r#"{"type":"markAsRead"}"#.to_string()))
        .await
        .unwrap();

    for ws in [&mut tab1, &mut tab2] {
        let update = next_json(ws).await;
        assert_eq!(update["type"], "notificationCount");
        assert_eq!(update["count"], 0);
    }
    // Hint only: the store is untouched.
    assert_eq!(state.store.unread_count("u1").await.unwrap(), 1);
}

#[tokio::test]
async fn test_malformed_client_message_keeps_connection() {
    let (addr, state) = start_test_server().await;
    let mut ws = connect(addr, "u1").await;
    assert_eq!(next_json(&mut ws).await["type"], "connection");

    ws.send(Message::text("{not json".to_string())).await.unwrap();
    ws.send(Message::text(r#"{"type":"selfDestruct"}"#.to_string()))
        .await
        .unwrap();
    assert_silent(&mut ws).await;
    assert_eq!(state.registry.connection_count("u1"), 1);

    publish(addr, json!({ "userId": "u1", "title": "Still", "message": "here" })).await;
    assert_eq!(next_json(&mut ws).await["title"], "Still");
}

#[tokio::test]
async fn test_mark_read_api_pushes_fresh_count() {
    let (addr, _state) = start_test_server().await;
    let mut ws = connect(addr, "u1").await;
    assert_eq!(next_json(&mut ws).await["type"], "connection");

    let created: Value = publish(addr, json!({ "userId": "u1", "title": "A", "message": "a" }))
        .await
        .json()
        .await
        .unwrap();
    publish(addr, json!({ "userId": "u1", "title": "B", "message": "b" })).await;
    assert_eq!(next_json(&mut ws).await["title"], "A");
    assert_eq!(next_json(&mut ws).await["title"], "B");

    let client = reqwest::Client::new();
    let id = created["id"].as_str().unwrap();
    let response = client
        .post(format!("http://{}/api/notifications/{}/read", addr, id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let update = next_json(&mut ws).await;
    assert_eq!(update["type"], "notificationCount");
    assert_eq!(update["count"], 1);

    let count: Value = client
        .get(format!("http://{}/api/notifications/unread-count?userId=u1", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(count["count"], 1);

    let list: Value = client
        .get(format!("http://{}/api/notifications?userId=u1&limit=10", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let titles: Vec<_> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["title"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(titles, vec!["B", "A"]);

    let unknown = client
        .post(format!("http://{}/api/notifications/nope/read", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status(), 404);
}

#[tokio::test]
async fn test_offline_traffic_does_not_grow_count_cache() {
    let (addr, state) = start_test_server().await;
    let client = reqwest::Client::new();
    for i in 0..50 {
        let user = format!("offline-{}", i);
        let response = publish(addr, json!({ "userId": user, "title": "T", "message": "m" })).await;
        assert_eq!(response.status(), 201);
        let count: Value = client
            .get(format!("http://{}/api/notifications/unread-count?userId={}", addr, user))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(count["count"], 1);
    }
    assert_eq!(state.registry.user_count(), 0);
    assert_eq!(state.counts.tracked_users(), 0);
}

/// Memory store whose unread count answers only after a delay, or fails.
struct SlowCountStore {
    inner: MemoryNotificationStore,
    delay: Duration,
    count_fails: bool,
}

#[async_trait]
impl NotificationStore for SlowCountStore {
    async fn create(&self, new: NewNotification) -> WashlineResult<Notification> {
        self.inner.create(new).await
    }

    async fn list_recent(
        &self,
        user_id: &str,
        limit: usize,
        unread_only: bool,
    ) -> WashlineResult<Vec<Notification>> {
        self.inner.list_recent(user_id, limit, unread_only).await
    }

    async fn unread_count(&self, user_id: &str) -> WashlineResult<u64> {
        tokio::time::sleep(self.delay).await;
        if self.count_fails {
            return Err(WashlineError::store("count backend down"));
        }
        self.inner.unread_count(user_id).await
    }

    async fn mark_read(&self, notification_id: &str) -> WashlineResult<Notification> {
        self.inner.mark_read(notification_id).await
    }

    async fn mark_all_read(&self, user_id: &str) -> WashlineResult<u64> {
        self.inner.mark_all_read(user_id).await
    }
}

#[tokio::test]
async fn test_handshake_is_always_first_frame() {
    let (addr, state) = start_server_with(Arc::new(SlowCountStore {
        inner: MemoryNotificationStore::new(),
        delay: Duration::from_millis(300),
        count_fails: false,
    }))
    .await;
    let mut ws = connect(addr, "u1").await;

    // Published while the handshake count is still being read.
    tokio::time::sleep(Duration::from_millis(50)).await;
    state
        .publish(NewNotification::new("u1", "Early", "m", Category::Info))
        .await
        .unwrap();

    let hello = next_json(&mut ws).await;
    assert_eq!(hello["type"], "connection");
    assert_eq!(hello["count"], 1);
    assert_silent(&mut ws).await;

    wait_until(|| state.registry.connection_count("u1") == 1).await;
    state
        .publish(NewNotification::new("u1", "Later", "m", Category::Info))
        .await
        .unwrap();
    assert_eq!(next_json(&mut ws).await["title"], "Later");
}

#[tokio::test]
async fn test_mark_read_succeeds_when_count_refresh_fails() {
    let (addr, state) = start_server_with(Arc::new(SlowCountStore {
        inner: MemoryNotificationStore::new(),
        delay: Duration::ZERO,
        count_fails: true,
    }))
    .await;
    let created = state
        .store
        .create(NewNotification::new("u1", "A", "a", Category::Info))
        .await
        .unwrap();

    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://{}/api/notifications/{}/read", addr, created.id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["read"], true);

    let response = client
        .post(format!("http://{}/api/notifications/read-all?userId=u1", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_client_ping_gets_exactly_one_pong() {
    let (addr, _state) = start_test_server().await;
    let mut ws = connect(addr, "u1").await;
    assert_eq!(next_json(&mut ws).await["type"], "connection");

    ws.send(Message::Ping(b"hi".to_vec().into())).await.unwrap();
    let frame = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    match frame {
        Message::Pong(data) => assert_eq!(&data[..], b"hi"),
        other => panic!("expected pong, got {:?}", other),
    }
    assert_silent(&mut ws).await;
}
