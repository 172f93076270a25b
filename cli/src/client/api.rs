//! Courier platform API client.
//!
//! Thin REST client used by the command layer. Only the identity endpoint is
//! wired up; transient-failure retries live here and nowhere else, so
//! credential-store prompts are never repeated behind the user's back.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::policies::ExponentialBackoff;
use reqwest_retry::RetryTransientMiddleware;
use serde::Deserialize;
use tokio::sync::RwLock;
use url::Url;

use crate::client::middleware::AuthMiddleware;
use crate::config::ApiConfig;
use crate::error::{CourierError, Result};

/// Identity of the bot a token belongs to, as reported by the platform.
#[derive(Debug, Clone, Deserialize)]
pub struct BotIdentity {
    /// Display name of the bot.
    pub bot_name: String,
    /// Platform-assigned bot ID.
    #[serde(default)]
    pub bot_id: String,
}

/// API client for the Courier platform.
pub struct CourierApiClient {
    client: ClientWithMiddleware,
    base_url: Url,
    token: Arc<RwLock<Option<String>>>,
}

impl CourierApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let inner_client = Client::builder()
            .user_agent(format!("courier-cli/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let token: Arc<RwLock<Option<String>>> = Arc::new(RwLock::new(None));

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);

        // Build middleware stack
        let client = ClientBuilder::new(inner_client)
            .with(AuthMiddleware::new(Arc::clone(&token)))
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            token,
        })
    }

    /// Set the access token used for subsequent requests.
    pub async fn set_token(&self, token: String) {
        *self.token.write().await = Some(token);
    }

    /// Fetch the identity of the bot the current token belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`CourierError::Unauthorized`] if the platform rejects the
    /// token, or [`CourierError::ApiError`] for other non-success responses.
    pub async fn fetch_identity(&self) -> Result<BotIdentity> {
        let url = self
            .base_url
            .join("/v1/self")
            .map_err(|e| CourierError::Config(format!("Invalid URL: {e}")))?;

        let response = self.client.get(url).send().await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(CourierError::Unauthorized);
        }
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CourierError::ApiError { status, message });
        }

        let identity: BotIdentity = response
            .json()
            .await
            .map_err(|e| CourierError::Serialization(e.to_string()))?;

        Ok(identity)
    }

    /// Get the base URL.
    #[must_use]
    #[allow(dead_code)]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> ApiConfig {
        ApiConfig {
            base_url: Url::parse(&server.uri()).unwrap(),
            timeout_secs: 5,
            max_retries: 0,
        }
    }

    #[tokio::test]
    async fn fetch_identity_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/self"))
            .and(header("authorization", "Bearer tok-A"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "bot_name": "WorkBot",
                "bot_id": "B123",
            })))
            .mount(&server)
            .await;

        let client = CourierApiClient::new(&config_for(&server)).unwrap();
        client.set_token("tok-A".to_string()).await;

        let identity = client.fetch_identity().await.unwrap();
        assert_eq!(identity.bot_name, "WorkBot");
        assert_eq!(identity.bot_id, "B123");
    }

    #[tokio::test]
    async fn rejected_token_maps_to_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/self"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = CourierApiClient::new(&config_for(&server)).unwrap();
        client.set_token("expired".to_string()).await;

        let err = client.fetch_identity().await.unwrap_err();
        assert!(matches!(err, CourierError::Unauthorized));
    }

    #[tokio::test]
    async fn server_error_includes_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/self"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let client = CourierApiClient::new(&config_for(&server)).unwrap();
        client.set_token("tok".to_string()).await;

        let err = client.fetch_identity().await.unwrap_err();
        match err {
            CourierError::ApiError { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "maintenance");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
