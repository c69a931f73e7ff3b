//! Web server notifier for out-of-process producers.
//!
//! Booking, contact and review handlers running in another process use this
//! to hand a notification to the live-push server, which persists it and
//! fans it out to the user's open connections.

use std::time::Duration;
use tracing::{debug, warn};

use crate::model::{NewNotification, Notification};

/// Default web server URL.
const DEFAULT_WEB_URL: &str = "http://127.0.0.1:3030";

/// Posts notifications to the web server over HTTP.
#[derive(Clone)]
pub struct WebNotifier {
    client: reqwest::Client,
    base_url: String,
}

impl WebNotifier {
    /// Create a new notifier with default settings.
    ///
    /// Uses the `WASHLINE_WEB_URL` environment variable if set,
    /// otherwise defaults to `http://127.0.0.1:3030`.
    pub fn new() -> Self {
        let base_url =
            std::env::var("WASHLINE_WEB_URL").unwrap_or_else(|_| DEFAULT_WEB_URL.to_string());
        Self::with_url(&base_url)
    }

    /// Create a notifier with a custom base URL.
    pub fn with_url(base_url: &str) -> Self {
        debug!(base_url = %base_url, "WebNotifier initialized");
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(2))
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a notification to `/internal/notify`.
    ///
    /// Returns the persisted notification on success. Failures are logged and
    /// swallowed: the caller's business operation must not fail because the
    /// push server is down.
    pub async fn notify(&self, new: &NewNotification) -> Option<Notification> {
        let url = format!("{}/internal/notify", self.base_url);
        debug!(url = %url, user_id = %new.user_id, title = %new.title, "Sending notification");

        match self.client.post(&url).json(new).send().await {
            Ok(response) if response.status().is_success() => {
                match response.json::<Notification>().await {
                    Ok(notification) => {
                        debug!(id = %notification.id, "Notification accepted");
                        Some(notification)
                    }
                    Err(e) => {
                        warn!(error = %e, "Notification accepted but response was unreadable");
                        None
                    }
                }
            }
            Ok(response) => {
                warn!(
                    user_id = %new.user_id,
                    status_code = %response.status(),
                    "Notification rejected by server"
                );
                None
            }
            Err(e) => {
                debug!(
                    user_id = %new.user_id,
                    error = %e,
                    url = %url,
                    "Failed to send notification (washline serve may not be running)"
                );
                None
            }
        }
    }
}

impl Default for WebNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;

    #[test]
    fn test_trailing_slash_trimmed() {
        let notifier = WebNotifier::with_url("http://localhost:9999/");
        assert_eq!(notifier.base_url(), "http://localhost:9999");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_silent() {
        // Port 9 (discard) is closed on test hosts; the call must not error.
        let notifier = WebNotifier::with_url("http://127.0.0.1:9");
        let result = notifier
            .notify(&NewNotification::new("u1", "t", "m", Category::Info))
            .await;
        assert!(result.is_none());
    }
}
