//! Client configuration.

use std::fmt;

/// Path of the portal's JSON API under the host.
pub const API_BASE_PATH: &str = "/DVSWebAPI/api";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default `User-Agent` sent with every request.
pub fn default_user_agent() -> String {
    format!("RustDVSPortal/{}", env!("CARGO_PKG_VERSION"))
}

/// Configuration for the portal client.
#[derive(Clone)]
pub struct PortalConfig {
    /// Portal host name, e.g. `parkeren.example.nl`
    pub host: String,
    /// Login identifier
    pub identifier: String,
    /// Login password
    pub password: String,
    /// API base URL (defaults to `https://{host}/DVSWebAPI/api`)
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// `User-Agent` header value
    pub user_agent: String,
    /// Externally owned HTTP session. The client never releases it.
    pub http_client: Option<reqwest::Client>,
}

impl PortalConfig {
    /// Create a new config for the given host and credentials.
    pub fn new(
        host: impl Into<String>,
        identifier: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let host = host.into();
        Self {
            base_url: format!("https://{host}{API_BASE_PATH}"),
            host,
            identifier: identifier.into(),
            password: password.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: default_user_agent(),
            http_client: None,
        }
    }

    /// Read host and credentials from the environment.
    ///
    /// Uses `DVSPORTAL_HOST`, `DVSPORTAL_IDENTIFIER`, `DVSPORTAL_PASSWORD`
    /// and optionally `DVSPORTAL_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let var = |name: &'static str| std::env::var(name).map_err(|_| ConfigError::Missing(name));

        let mut config = Self::new(
            var("DVSPORTAL_HOST")?,
            var("DVSPORTAL_IDENTIFIER")?,
            var("DVSPORTAL_PASSWORD")?,
        );

        if let Ok(raw) = std::env::var("DVSPORTAL_TIMEOUT_SECS") {
            let secs = raw.parse().map_err(|_| ConfigError::Invalid {
                name: "DVSPORTAL_TIMEOUT_SECS",
                value: raw,
            })?;
            config = config.with_timeout(secs);
        }

        Ok(config)
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set the `User-Agent` header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Share an existing HTTP client instead of building one.
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }
}

impl fmt::Debug for PortalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortalConfig")
            .field("host", &self.host)
            .field("identifier", &self.identifier)
            .field("password", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("http_client", &self.http_client.is_some())
            .finish()
    }
}

/// Errors loading configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    Missing(&'static str),

    #[error("environment variable {name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}
