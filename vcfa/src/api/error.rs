use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("entity not found: {0}")]
    NotFound(String),

    #[error("more than one entity matches {0}")]
    Ambiguous(String),

    #[error("API returned error (HTTP {status}): {message}")]
    Api {
        status: u16,
        message: String,
        minor_code: Option<String>,
    },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("task {task} failed: {message}")]
    Task { task: String, message: String },

    #[error("Timed out after {0} seconds")]
    Timeout(u64),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Too many requests, rate limited")]
    RateLimited,

    #[error("Service unavailable, retry later")]
    ServiceUnavailable,

    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),
}

impl ApiError {
    /// True for 404s and for the error bodies VCFA uses when an entity is
    /// missing but the status code is something else
    pub fn is_not_found(&self) -> bool {
        match self {
            ApiError::NotFound(_) => true,
            ApiError::Api {
                message,
                minor_code,
                ..
            } => {
                minor_code.as_deref() == Some("ENTITY_NOT_FOUND")
                    || message.contains("ENTITY_NOT_FOUND")
                    || message.contains("does not exist")
            }
            _ => false,
        }
    }
}
