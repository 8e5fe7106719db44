//! `reqwest` implementation of the backend seams.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, RETRY_AFTER};
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;
use wearables_core::{CartId, ProductId, Quantity, UserId};

use super::types::{ApiCart, ApiUser, CartLine, MeResponse};
use super::{BackendError, CartBackend, SessionBackend};
use crate::config::ApiConfig;

/// Characters of a response body kept in logs and error messages.
const BODY_SNIPPET_LEN: usize = 200;

/// Client for the storefront backend REST API.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    token: Option<SecretString>,
}

impl ApiClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed (e.g., the
    /// TLS backend fails to initialize).
    pub fn new(config: &ApiConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.clone(),
                token: config.token.clone(),
            }),
        })
    }

    /// Base URL endpoint paths are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Start a request to `path` (relative to the base URL).
    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, BackendError> {
        let url = self.inner.base_url.join(path)?;
        let mut builder = self.inner.client.request(method, url);

        if let Some(token) = &self.inner.token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token.expose_secret()));
        }

        Ok(builder)
    }

    /// Send a request and return the body of a successful response.
    async fn execute(&self, builder: RequestBuilder) -> Result<String, BackendError> {
        let response = builder.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(BackendError::RateLimited(retry_after));
        }

        if status == StatusCode::UNAUTHORIZED {
            return Err(BackendError::Unauthorized);
        }

        // Read as text first for better error diagnostics
        let body = response.text().await?;

        if !status.is_success() {
            let snippet = body.chars().take(BODY_SNIPPET_LEN).collect::<String>();
            tracing::warn!(
                status = %status,
                body = %snippet,
                "Backend returned non-success status"
            );
            return Err(BackendError::Status {
                status: status.as_u16(),
                body: snippet,
            });
        }

        Ok(body)
    }

    /// Send a request and parse the JSON body of a successful response.
    async fn execute_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, BackendError> {
        let body = self.execute(builder).await?;

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(BODY_SNIPPET_LEN).collect::<String>(),
                "Failed to parse backend response"
            );
            BackendError::Parse(e)
        })
    }
}

#[async_trait]
impl CartBackend for ApiClient {
    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn get_cart(&self, user_id: UserId) -> Result<ApiCart, BackendError> {
        let builder = self.request(Method::GET, &format!("cart/{user_id}"))?;
        self.execute_json(builder).await
    }

    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id))]
    async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<ApiCart, BackendError> {
        let builder = self
            .request(Method::POST, &format!("cart/{user_id}/add"))?
            .query(&[
                ("productId", product_id.to_string()),
                ("quantity", quantity.to_string()),
            ]);
        self.execute_json(builder).await
    }

    #[instrument(skip(self), fields(cart_id = %cart_id, product_id = %product_id))]
    async fn update_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<ApiCart, BackendError> {
        let builder = self
            .request(Method::PUT, &format!("cart/{cart_id}/update"))?
            .query(&[
                ("productId", product_id.to_string()),
                ("quantity", quantity.to_string()),
            ]);
        self.execute_json(builder).await
    }

    #[instrument(skip(self), fields(cart_id = %cart_id, product_id = %product_id))]
    async fn remove_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<(), BackendError> {
        let builder = self
            .request(Method::DELETE, &format!("cart/{cart_id}/remove"))?
            .query(&[("productId", product_id.to_string())]);
        self.execute(builder).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(cart_id = %cart_id))]
    async fn clear_cart(&self, cart_id: CartId) -> Result<(), BackendError> {
        let builder = self.request(Method::DELETE, &format!("cart/{cart_id}/clear"))?;
        self.execute(builder).await?;
        Ok(())
    }

    #[instrument(skip(self, lines), fields(user_id = %user_id, lines = lines.len()))]
    async fn merge_cart(
        &self,
        user_id: UserId,
        lines: &[CartLine],
    ) -> Result<ApiCart, BackendError> {
        let builder = self
            .request(Method::POST, "cart/merge")?
            .query(&[("userId", user_id.to_string())])
            .json(lines);
        self.execute_json(builder).await
    }
}

#[async_trait]
impl SessionBackend for ApiClient {
    #[instrument(skip(self))]
    async fn current_user(&self) -> Result<Option<ApiUser>, BackendError> {
        let builder = self.request(Method::GET, "auth/me")?;
        match self.execute_json::<MeResponse>(builder).await {
            Ok(me) => Ok(me.user),
            Err(BackendError::Unauthorized) => {
                debug!("No active session");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self))]
    async fn logout(&self) -> Result<(), BackendError> {
        let builder = self.request(Method::POST, "auth/logout")?;
        self.execute(builder).await?;
        Ok(())
    }
}
