//! Error types and result aliases for the courier CLI.
//!
//! This module provides a comprehensive error handling system with:
//! - Specific error variants for different failure modes
//! - User-friendly error messages with recovery suggestions
//! - Helper methods for error classification
//! - Automatic conversion from common error types

use thiserror::Error;

use crate::accounts::AccountError;
use crate::login::LoginError;

/// Main error type for courier operations.
///
/// Each variant includes a user-friendly message with actionable recovery steps.
/// Use [`requires_login`](Self::requires_login) and [`is_retriable`](Self::is_retriable)
/// to determine appropriate error handling strategies.
#[derive(Error, Debug)]
pub enum CourierError {
    /// No accounts exist in the credential store.
    #[error("No accounts configured. Run 'courier auth login' to add one.")]
    NotAuthenticated,

    /// Platform API rejected the stored token.
    #[error("The platform rejected the stored token (401). Run 'courier auth login' to replace it.")]
    Unauthorized,

    /// API returned a non-success status code.
    #[error("API request failed ({status}): {message}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Error message from the API.
        message: String,
    },

    /// API server is unreachable (503 or connection failed).
    #[error("The Courier API is unavailable. Check your network connection or try again later.")]
    ApiUnavailable,

    /// Request timed out.
    #[error("Request timed out. The server may be slow or unreachable. Try again later.")]
    Timeout,

    /// Network error during HTTP request.
    #[error("Network error: {0}. Check your internet connection.")]
    Network(String),

    /// General configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failed to read configuration file.
    #[error("Failed to read configuration file: {0}. Check file permissions and format.")]
    ConfigRead(String),

    /// Failed to write configuration file.
    #[error("Failed to write configuration file: {0}. Check directory permissions.")]
    ConfigWrite(String),

    /// IO operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON or TOML serialization/deserialization failed.
    #[error("Data serialization error: {0}. This may indicate corrupted data.")]
    Serialization(String),

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Credential store error.
    #[error(transparent)]
    Account(#[from] AccountError),

    /// Interactive login error.
    #[error(transparent)]
    Login(#[from] LoginError),
}

impl CourierError {
    /// Checks if this error can be resolved by logging in (again).
    ///
    /// Returns `true` for errors related to missing or rejected credentials.
    /// Use this to determine when to prompt the user to run `courier auth login`.
    #[allow(dead_code)] // Kept for future use in main error handler
    #[must_use]
    pub const fn requires_login(&self) -> bool {
        matches!(
            self,
            Self::NotAuthenticated | Self::Unauthorized | Self::Account(AccountError::Corrupted(_))
        )
    }

    /// Checks if this error is transient and the operation might succeed on retry.
    ///
    /// Returns `true` for network-related errors and service unavailability.
    /// Credential-store failures are deliberately excluded: retrying a
    /// secure-storage prompt without the user noticing is a surprise, not a fix.
    #[allow(dead_code)] // Kept for future use in API client retry logic
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout | Self::ApiUnavailable)
    }
}

/// Result type alias using [`CourierError`].
pub type Result<T> = std::result::Result<T, CourierError>;

impl From<serde_json::Error> for CourierError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(format!("JSON error: {err}"))
    }
}

impl From<toml::de::Error> for CourierError {
    fn from(err: toml::de::Error) -> Self {
        Self::ConfigRead(format!("TOML parse error: {err}"))
    }
}

impl From<toml::ser::Error> for CourierError {
    fn from(err: toml::ser::Error) -> Self {
        Self::ConfigWrite(format!("TOML serialize error: {err}"))
    }
}

impl From<reqwest::Error> for CourierError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::ApiUnavailable
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<reqwest_middleware::Error> for CourierError {
    fn from(err: reqwest_middleware::Error) -> Self {
        let err_str = err.to_string();
        if err_str.contains("timeout") || err_str.contains("timed out") {
            Self::Timeout
        } else if err_str.contains("connect") || err_str.contains("connection") {
            Self::ApiUnavailable
        } else {
            Self::Network(err_str)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_user_friendly() {
        let not_auth = CourierError::NotAuthenticated;
        assert!(not_auth.to_string().contains("courier auth login"));

        let unauthorized = CourierError::Unauthorized;
        assert!(unauthorized.to_string().contains("courier auth login"));

        let missing = CourierError::Account(AccountError::NotFound("work".to_string()));
        assert!(missing.to_string().contains("work"));
        assert!(missing.to_string().contains("courier account list"));
    }

    #[test]
    fn api_error_includes_status_and_message() {
        let err = CourierError::ApiError {
            status: 404,
            message: "Not found".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("404"));
        assert!(msg.contains("Not found"));
    }

    #[test]
    fn requires_login_identifies_credential_errors() {
        assert!(CourierError::NotAuthenticated.requires_login());
        assert!(CourierError::Unauthorized.requires_login());
        assert!(
            CourierError::Account(AccountError::Corrupted("bad json".to_string())).requires_login()
        );

        assert!(!CourierError::Timeout.requires_login());
        assert!(!CourierError::ApiUnavailable.requires_login());
        assert!(!CourierError::Network("test".to_string()).requires_login());
    }

    #[test]
    fn is_retriable_identifies_transient_errors() {
        assert!(CourierError::Timeout.is_retriable());
        assert!(CourierError::ApiUnavailable.is_retriable());
        assert!(CourierError::Network("test".to_string()).is_retriable());

        assert!(!CourierError::NotAuthenticated.is_retriable());
        assert!(!CourierError::Unauthorized.is_retriable());
        // Store failures stay under user control, never auto-retried.
        assert!(
            !CourierError::Account(AccountError::Unavailable("keyring locked".to_string()))
                .is_retriable()
        );
    }

    #[test]
    fn from_serde_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let courier_err: CourierError = json_err.into();
        assert!(matches!(courier_err, CourierError::Serialization(_)));
    }

    #[test]
    fn from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let courier_err: CourierError = io_err.into();
        assert!(matches!(courier_err, CourierError::Io(_)));
    }

    #[test]
    fn from_url_parse_error() {
        let url_err = url::Url::parse("not a url").unwrap_err();
        let courier_err: CourierError = url_err.into();
        assert!(matches!(courier_err, CourierError::InvalidUrl(_)));
    }
}
