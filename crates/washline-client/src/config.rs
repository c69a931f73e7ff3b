//! Agent configuration.

use std::time::Duration;

use crate::error::{AgentError, AgentResult};

/// Delay between attempts. Attempts are unlimited.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Upgrade endpoint, e.g. `ws://127.0.0.1:3030/ws`.
    pub ws_url: String,
    pub reconnect_delay: Duration,
    /// Notifications kept in the local cache.
    pub history_limit: usize,
}

impl AgentConfig {
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Upgrade URL with the user identity embedded as `userId`.
    pub fn connect_url(&self, user_id: &str) -> AgentResult<String> {
        let url = reqwest::Url::parse_with_params(&self.ws_url, &[("userId", user_id)])
            .map_err(|e| AgentError::InvalidUrl(format!("{}: {}", self.ws_url, e)))?;
        Ok(url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_url_embeds_identity() {
        let config = AgentConfig::new("ws://127.0.0.1:3030/ws");
        assert_eq!(
            config.connect_url("u1").unwrap(),
            "ws://127.0.0.1:3030/ws?userId=u1"
        );
        assert_eq!(
            config.connect_url("a b&c").unwrap(),
            "ws://127.0.0.1:3030/ws?userId=a+b%26c"
        );
        assert!(AgentConfig::new("not a url").connect_url("u1").is_err());
    }

    #[test]
    fn test_defaults() {
        let config = AgentConfig::new("ws://x/ws");
        assert_eq!(config.reconnect_delay, DEFAULT_RECONNECT_DELAY);
        assert_eq!(config.history_limit, DEFAULT_HISTORY_LIMIT);
    }
}
