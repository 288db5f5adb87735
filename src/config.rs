use std::time::Duration;

const DEFAULT_API_URL: &str = "http://localhost:8000/api/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Backend connection settings shared by the upload submitter and the API client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the versioned API, without a trailing slash.
    pub api_url: String,
    /// Whole-request timeout, uploads included.
    pub timeout: Duration,
    /// Bearer token sent as `Authorization` when present.
    pub token: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            token: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                        |
    /// |------------------------------|--------------------------------|
    /// | `ACCIDENTS_API_URL`          | `http://localhost:8000/api/v1` |
    /// | `ACCIDENTS_API_TIMEOUT_SECS` | `30`                           |
    /// | `ACCIDENTS_API_TOKEN`        | unset                          |
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ClientConfig::from_env`] over an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("ACCIDENTS_API_URL")
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let timeout_secs = match lookup("ACCIDENTS_API_TIMEOUT_SECS") {
            None => DEFAULT_TIMEOUT_SECS,
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    tracing::warn!(value = %raw, "ACCIDENTS_API_TIMEOUT_SECS is not a positive integer, using default");
                    DEFAULT_TIMEOUT_SECS
                }
            },
        };

        let token = lookup("ACCIDENTS_API_TOKEN").filter(|t| !t.trim().is_empty());

        Self {
            api_url,
            timeout: Duration::from_secs(timeout_secs),
            token,
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    /// `POST` target for whole-file ingestion.
    pub fn upload_endpoint(&self) -> String {
        format!("{}/accidents/upload", self.api_url)
    }

    /// Build a pooled HTTP client honoring the configured timeout.
    pub fn http_client(&self) -> reqwest::Result<reqwest::Client> {
        reqwest::Client::builder().timeout(self.timeout).build()
    }
}
