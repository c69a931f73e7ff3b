//! Read access to the notification store for reconciliation.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use washline_core::Notification;

use crate::error::{AgentError, AgentResult};

/// What the agent needs from the store to rebuild its cache.
#[async_trait]
pub trait StoreClient: Send + Sync {
    async fn list_recent(&self, user_id: &str, limit: usize) -> AgentResult<Vec<Notification>>;

    async fn unread_count(&self, user_id: &str) -> AgentResult<u64>;
}

#[derive(Deserialize)]
struct CountResponse {
    count: u64,
}

/// Store access through the server's `/api/notifications` endpoints.
#[derive(Clone)]
pub struct HttpStoreClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpStoreClient {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:3030`.
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(5))
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> AgentResult<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "Fetching from store");
        let response = self.client.get(&url).query(query).send().await?;
        if !response.status().is_success() {
            return Err(AgentError::Status(response.status().as_u16()));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl StoreClient for HttpStoreClient {
    async fn list_recent(&self, user_id: &str, limit: usize) -> AgentResult<Vec<Notification>> {
        self.get_json(
            "/api/notifications",
            &[("userId", user_id.to_string()), ("limit", limit.to_string())],
        )
        .await
    }

    async fn unread_count(&self, user_id: &str) -> AgentResult<u64> {
        let body: CountResponse = self
            .get_json(
                "/api/notifications/unread-count",
                &[("userId", user_id.to_string())],
            )
            .await?;
        Ok(body.count)
    }
}
