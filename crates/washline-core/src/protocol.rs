//! Live-push wire protocol.
//!
//! Both directions are JSON text frames tagged by a `type` field. Anything
//! that does not decode into one of the known variants is a protocol error,
//! which receivers log and drop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{WashlineError, WashlineResult};
use crate::model::{Category, Notification, RelatedRef};

/// Server → client messages.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Handshake sent once, right after the connection is registered.
    Connection {
        count: u64,
        message: String,
        timestamp: DateTime<Utc>,
    },
    /// A new notification for the connected user.
    Notification {
        id: String,
        title: String,
        message: String,
        category: Category,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        link: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        related: Option<RelatedRef>,
        timestamp: DateTime<Utc>,
    },
    /// Count-only update.
    NotificationCount {
        count: u64,
        timestamp: DateTime<Utc>,
    },
}

impl ServerMessage {
    pub fn connected(count: u64) -> Self {
        Self::Connection {
            count,
            message: "Connected to notification service".to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn count(count: u64) -> Self {
        Self::NotificationCount {
            count,
            timestamp: Utc::now(),
        }
    }

    /// Serialize once; the result is shared by every recipient.
    pub fn encode(&self) -> WashlineResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(text: &str) -> WashlineResult<Self> {
        serde_json::from_str(text).map_err(|e| WashlineError::Protocol(e.to_string()))
    }

    /// Rebuild the persisted shape of a pushed notification for the given user.
    ///
    /// Returns `None` for non-notification messages.
    pub fn into_notification(self, user_id: &str) -> Option<Notification> {
        match self {
            Self::Notification {
                id,
                title,
                message,
                category,
                link,
                related,
                timestamp,
            } => Some(Notification {
                id,
                user_id: user_id.to_string(),
                title,
                message,
                category,
                read: false,
                link,
                related,
                created_at: timestamp,
            }),
            _ => None,
        }
    }
}

impl From<&Notification> for ServerMessage {
    fn from(n: &Notification) -> Self {
        Self::Notification {
            id: n.id.clone(),
            title: n.title.clone(),
            message: n.message.clone(),
            category: n.category,
            link: n.link.clone(),
            related: n.related.clone(),
            timestamp: n.created_at,
        }
    }
}

/// Client → server messages. Best-effort hints only.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Reset the server-side unread cache for this user. Does not touch the store.
    MarkAsRead,
}

impl ClientMessage {
    pub fn encode(&self) -> WashlineResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(text: &str) -> WashlineResult<Self> {
        serde_json::from_str(text).map_err(|e| WashlineError::Protocol(e.to_string()))
    }
}
