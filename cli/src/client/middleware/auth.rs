//! Authentication middleware for injecting Bearer tokens.

use std::sync::Arc;

use async_trait::async_trait;
use http::Extensions;
use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next, Result};
use tokio::sync::RwLock;

/// Middleware that injects the selected account's token into requests.
pub struct AuthMiddleware {
    token: Arc<RwLock<Option<String>>>,
}

impl AuthMiddleware {
    /// Create a new authentication middleware.
    #[must_use]
    pub fn new(token: Arc<RwLock<Option<String>>>) -> Self {
        Self { token }
    }
}

#[async_trait]
impl Middleware for AuthMiddleware {
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> Result<Response> {
        // Inject Authorization header if a token is loaded
        if let Some(token) = self.token.read().await.as_ref() {
            if let Ok(value) = format!("Bearer {token}").parse() {
                req.headers_mut().insert(http::header::AUTHORIZATION, value);
            }
        }

        next.run(req, extensions).await
    }
}
