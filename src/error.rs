//! Error types for the EcoSense client.

/// Top-level error type.
///
/// Storage and backend failures are handled inside the flows and never
/// reach this level.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Session storage failures.
///
/// These never leave the session store; they are logged and downgraded there.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Session storage is unavailable")]
    Unavailable,

    #[error("Quota exceeded writing {key}: {needed} bytes needed, {limit} allowed")]
    QuotaExceeded {
        key: String,
        needed: usize,
        limit: usize,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Backend request failures.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned {status}{}", status_suffix(.message))]
    Status {
        status: u16,
        message: Option<String>,
    },

    #[error("Failed to encode request: {0}")]
    Encode(serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl BackendError {
    /// The user-facing description supplied by the backend, if any.
    /// An empty message counts as none.
    pub fn user_message(&self) -> Option<&str> {
        match self {
            Self::Status {
                message: Some(message),
                ..
            } if !message.is_empty() => Some(message.as_str()),
            _ => None,
        }
    }

    /// HTTP status code, when the request got far enough to receive one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            Self::Encode(_) | Self::InvalidResponse(_) => None,
        }
    }
}

fn status_suffix(message: &Option<String>) -> String {
    match message {
        Some(m) => format!(": {m}"),
        None => String::new(),
    }
}

/// Result type alias for the client.
pub type Result<T> = std::result::Result<T, Error>;
