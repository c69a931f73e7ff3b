//! Notification domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{WashlineError, WashlineResult};

/// A persisted notification addressed to one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub message: String,
    pub category: Category,
    pub read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related: Option<RelatedRef>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Build an unread notification from a validated creation request.
    pub fn from_new(new: NewNotification) -> WashlineResult<Self> {
        new.validate()?;
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            user_id: new.user_id,
            title: new.title,
            message: new.message,
            category: new.category,
            read: false,
            link: new.link,
            related: new.related,
            created_at: Utc::now(),
        })
    }

    /// Mark as read. Returns `true` if the flag changed.
    ///
    /// There is no inverse: a read notification stays read.
    pub fn mark_read(&mut self) -> bool {
        let changed = !self.read;
        self.read = true;
        changed
    }
}

/// Notification category tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

impl Category {
    /// Parse from string. Unknown names are rejected.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "info" => Some(Self::Info),
            "success" => Some(Self::Success),
            "warning" => Some(Self::Warning),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Convert to string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to the business object a notification is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedRef {
    /// Object kind, e.g. `booking`.
    pub kind: String,
    pub id: String,
}

/// Request to create a notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNotification {
    pub user_id: String,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related: Option<RelatedRef>,
}

impl NewNotification {
    pub fn new(
        user_id: impl Into<String>,
        title: impl Into<String>,
        message: impl Into<String>,
        category: Category,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            title: title.into(),
            message: message.into(),
            category,
            link: None,
            related: None,
        }
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn with_related(mut self, kind: impl Into<String>, id: impl Into<String>) -> Self {
        self.related = Some(RelatedRef {
            kind: kind.into(),
            id: id.into(),
        });
        self
    }

    /// Check required fields are present.
    pub fn validate(&self) -> WashlineResult<()> {
        if self.user_id.trim().is_empty() {
            return Err(WashlineError::validation("userId is required"));
        }
        if self.title.trim().is_empty() {
            return Err(WashlineError::validation("title is required"));
        }
        if self.message.trim().is_empty() {
            return Err(WashlineError::validation("message is required"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_read_is_one_directional() {
        let mut n = Notification::from_new(NewNotification::new(
            "u1",
            "Booking Confirmed",
            "Your wash is booked",
            Category::Success,
        ))
        .unwrap();
        assert!(!n.read);
        assert!(n.mark_read());
        assert!(n.read);
        assert!(!n.mark_read());
        assert!(n.read);
    }

    #[test]
    fn test_blank_fields_rejected() {
        let err = Notification::from_new(NewNotification::new(" ", "t", "m", Category::Info))
            .unwrap_err();
        assert!(matches!(err, WashlineError::ValidationError(_)));

        let err = NewNotification::new("u1", "", "m", Category::Info)
            .validate()
            .unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn test_category_parse() {
        assert_eq!(Category::parse("Warning"), Some(Category::Warning));
        assert_eq!(Category::parse("informational"), None);
        assert_eq!(Category::Error.as_str(), "error");
    }

    #[test]
    fn test_new_notification_json_defaults() {
        let json = r#"{"userId":"u1","title":"Hi","message":"There"}"#;
        let new: NewNotification = serde_json::from_str(json).unwrap();
        assert_eq!(new.category, Category::Info);
        assert!(new.link.is_none());

        let bad = r#"{"userId":"u1","title":"Hi","message":"There","category":"urgent"}"#;
        assert!(serde_json::from_str::<NewNotification>(bad).is_err());
    }
}
