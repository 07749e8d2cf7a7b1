use std::env;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 3;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 300;

/// Connection and cadence settings for one [`crate::ApiClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    /// Fixed delay between status polls.
    pub poll_interval: Duration,
    /// Timeout for status, results, and document requests.
    pub request_timeout: Duration,
    /// Timeout for the upload request. Video payloads are large.
    pub upload_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            upload_timeout: Duration::from_secs(DEFAULT_UPLOAD_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    /// Builds a config from environment variables, reading a `.env` file
    /// when one is present. Unset or unparsable values keep their defaults.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let mut config = Self::default();

        if let Ok(url) = env::var("RECAP_API_URL") {
            if !url.is_empty() {
                config.base_url = url;
            }
        }
        if let Some(secs) = env_secs("RECAP_POLL_INTERVAL_SECS") {
            config.poll_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = env_secs("RECAP_REQUEST_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env_secs("RECAP_UPLOAD_TIMEOUT_SECS") {
            config.upload_timeout = Duration::from_secs(secs);
        }

        tracing::info!(
            "Client config: base_url={}, poll_interval={:?}",
            config.base_url,
            config.poll_interval
        );

        config
    }
}

fn env_secs(key: &str) -> Option<u64> {
    env::var(key).ok()?.parse().ok()
}
