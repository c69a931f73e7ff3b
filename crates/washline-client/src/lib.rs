//! Washline client agent.
//!
//! Keeps one live-push connection per signed-in user, reconnects after a
//! fixed delay whenever it drops, and keeps a local cache of recent
//! notifications that is reconciled against the store on every (re)connect.

pub mod agent;
pub mod cache;
pub mod config;
pub mod error;
pub mod store_client;

pub use agent::{AgentEvent, AgentHandle, NotificationAgent};
pub use cache::ClientCache;
pub use config::AgentConfig;
pub use error::{AgentError, AgentResult};
pub use store_client::{HttpStoreClient, StoreClient};
