//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

/// Default backend origin when `ECOSENSE_API_BASE_URL` is unset.
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:3000";

/// Default session directory when `ECOSENSE_SESSION_DIR` is unset.
pub const DEFAULT_SESSION_DIR: &str = "./.ecosense-session";

/// Client configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend origin; API paths are joined onto it.
    pub api_base_url: String,
    /// Per-request timeout for backend calls.
    pub request_timeout: Duration,
    /// Directory holding the session records. `None` keeps the session in memory.
    pub session_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            session_dir: Some(PathBuf::from(DEFAULT_SESSION_DIR)),
        }
    }
}

impl ClientConfig {
    /// Build config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let api_base_url = lookup("ECOSENSE_API_BASE_URL")
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.api_base_url);

        let request_timeout = lookup("ECOSENSE_REQUEST_TIMEOUT_SECS")
            .and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        // An explicitly empty value selects the in-memory session.
        let session_dir = match lookup("ECOSENSE_SESSION_DIR") {
            Some(dir) if dir.trim().is_empty() => None,
            Some(dir) => Some(PathBuf::from(dir)),
            None => defaults.session_dir,
        };

        Self {
            api_base_url,
            request_timeout,
            session_dir,
        }
    }
}
