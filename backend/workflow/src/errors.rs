//! Errors raised while talking to the IDE API.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Project was modified elsewhere: {0}")]
    Conflict(String),

    #[error("{0} timed out after {1}s")]
    Timeout(&'static str, u64),

    #[error("{0} cancelled")]
    Cancelled(&'static str),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, WorkflowError>;
