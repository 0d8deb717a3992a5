//! Error kinds shared by the analysis pipeline and the storage layer.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SenseError>;

#[derive(Debug, Error)]
pub enum SenseError {
    /// Rejected before any I/O (e.g. empty review text).
    #[error("validation error: {0}")]
    Validation(String),

    /// Endpoint unreachable or answered with a non-2xx status.
    #[error("network error: {0}")]
    Network(String),

    #[error("request to {endpoint} timed out after {timeout_ms} ms")]
    Timeout { endpoint: String, timeout_ms: u64 },

    /// 2xx answer that carried an error field or an unusable body.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Persistence read/write failure (quota, permissions, corrupt JSON).
    #[error("storage error: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl SenseError {
    /// Whether the tiered client should move on to the next backend.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SenseError::Network(_) | SenseError::Timeout { .. } | SenseError::Upstream(_)
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SenseError::Validation(_) => "validation",
            SenseError::Network(_) => "network",
            SenseError::Timeout { .. } => "timeout",
            SenseError::Upstream(_) => "upstream",
            SenseError::Storage(_) => "storage",
            SenseError::Config(_) => "config",
        }
    }
}

impl From<std::io::Error> for SenseError {
    fn from(e: std::io::Error) -> Self {
        SenseError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for SenseError {
    fn from(e: serde_json::Error) -> Self {
        SenseError::Storage(format!("invalid JSON: {e}"))
    }
}
