//! Application configuration settings.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::login::DEFAULT_LOGIN_TIMEOUT_SECS;

/// Main configuration for the courier CLI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CourierConfig {
    /// API client settings.
    pub api: ApiConfig,
    /// Interactive login settings.
    pub login: LoginConfig,
}

/// API client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Platform API base URL.
    #[serde(with = "url_serde")]
    pub base_url: Url,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Maximum number of retries for failed requests.
    pub max_retries: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse("https://api.courier.chat").expect("valid default URL"),
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

/// Interactive login configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginConfig {
    /// How long the login callback server waits for a submission, in seconds.
    pub timeout_secs: u64,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_LOGIN_TIMEOUT_SECS,
        }
    }
}

/// Custom serde module for URL serialization.
mod url_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use url::Url;

    pub fn serialize<S>(url: &Url, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(url.as_str())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Url, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Url::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Environment variables that can override configuration.
pub mod env {
    pub const API_URL: &str = "COURIER_API_URL";
    pub const ACCOUNT: &str = "COURIER_ACCOUNT";
    pub const LOGIN_TIMEOUT: &str = "COURIER_LOGIN_TIMEOUT";
    pub const LOG_LEVEL: &str = "COURIER_LOG";
}

impl CourierConfig {
    /// Apply environment variable overrides to the configuration.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(env::API_URL) {
            if let Ok(parsed) = Url::parse(&url) {
                self.api.base_url = parsed;
            }
        }

        if let Ok(timeout) = std::env::var(env::LOGIN_TIMEOUT) {
            if let Ok(secs) = timeout.parse() {
                self.login.timeout_secs = secs;
            }
        }

        self
    }
}
