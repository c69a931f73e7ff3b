//! Client agent errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Store returned status {0}")]
    Status(u16),
}

pub type AgentResult<T> = Result<T, AgentError>;
