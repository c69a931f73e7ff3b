//! Washline Core Library
//!
//! Notification model, live-push wire protocol and the store seam shared by
//! the server, the client agent and the CLI.

pub mod error;
pub mod model;
pub mod notifier;
pub mod protocol;
pub mod store;

pub use error::{WashlineError, WashlineResult};
pub use model::{Category, NewNotification, Notification, RelatedRef};
pub use protocol::{ClientMessage, ServerMessage};
pub use store::{MemoryNotificationStore, NotificationStore};
