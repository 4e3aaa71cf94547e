// src/errors.rs

//! Crate-wide error type.
//!
//! Construction and decoding failures are typed so callers can tell a missing
//! flow context apart from a badly typed field or a storage miss. Handler
//! bodies stay on `anyhow` and are wrapped in [`TaskflowError::Handler`].

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskflowError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Type error: {0}")]
    Type(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Unknown task handler: {0}")]
    UnknownHandler(String),

    #[error("Cycle detected in flow '{flow}' involving task '{task}'")]
    Cycle { flow: String, task: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Task handler failed: {0:#}")]
    Handler(#[source] anyhow::Error),
}

impl TaskflowError {
    /// True for lookups that simply found nothing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, TaskflowError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, TaskflowError>;
