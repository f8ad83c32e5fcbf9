//! API client for the store REST API.
//!
//! `ApiClient` wraps a `reqwest::Client` so that call sites never pass the
//! credential themselves: the token is looked up in the `TokenStore` right
//! before each request is dispatched.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{header, Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use crate::auth::TokenStore;
use crate::models::{
    LoginRequest, LoginResponse, Order, OrderInput, Product, ProductInput, RegisterRequest, User,
};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Base URL used when neither the environment nor the config sets one
pub const DEFAULT_API_URL: &str = "http://localhost:3001/api";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// API client for the store backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    store: Arc<dyn TokenStore>,
}

impl ApiClient {
    /// Create a new API client reading credentials from `store`
    pub fn new(base_url: &str, store: Arc<dyn TokenStore>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            store,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Headers carrying the current credential, if any.
    ///
    /// Never fails: a missing or unencodable token yields an unauthenticated
    /// request and the server decides.
    fn auth_headers(&self) -> header::HeaderMap {
        let mut headers = header::HeaderMap::new();
        if let Some(token) = self.store.get() {
            match header::HeaderValue::from_str(&format!("Bearer {}", token)) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    headers.insert(header::AUTHORIZATION, value);
                }
                Err(e) => {
                    warn!(error = %e, "Stored token is not a valid header value, sending without credential");
                }
            }
        }
        headers
    }

    /// Start a request with the current credential attached.
    /// The flag reports whether a credential was actually attached.
    fn authenticated(&self, method: Method, path: &str) -> (RequestBuilder, bool) {
        let headers = self.auth_headers();
        let carries_credential = headers.contains_key(header::AUTHORIZATION);
        debug!(%method, path, carries_credential, "Preparing request");
        let builder = self.client.request(method, self.url(path)).headers(headers);
        (builder, carries_credential)
    }

    /// Start a request that never carries a credential (login, registration)
    fn anonymous(&self, method: Method, path: &str) -> RequestBuilder {
        debug!(%method, path, "Preparing anonymous request");
        self.client.request(method, self.url(path))
    }

    async fn dispatch(&self, builder: RequestBuilder, carries_credential: bool) -> Result<Response> {
        let response = builder
            .send()
            .await
            .map_err(ApiError::from)
            .context("Failed to reach the API")?;
        self.check_response(response, carries_credential).await
    }

    /// Check if response is successful, returning an error with body if not.
    /// A 401 on a request that carried a credential invalidates the session.
    async fn check_response(&self, response: Response, carries_credential: bool) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().path().to_string();
        let body = response.text().await.unwrap_or_default();
        let err = ApiError::from_status(status, &body);

        if err.is_unauthorized() && carries_credential {
            warn!(path = %url, "Credential rejected, clearing session");
            if let Err(e) = self.store.clear() {
                warn!(error = %e, "Failed to clear rejected token");
            }
        } else {
            debug!(path = %url, %status, "Request failed");
        }

        Err(err.into())
    }

    async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T> {
        let text = response
            .text()
            .await
            .map_err(ApiError::from)
            .context("Failed to read response body")?;
        serde_json::from_str(&text).map_err(|e| ApiError::InvalidResponse(e.to_string()).into())
    }

    /// Parse a body that the server may leave empty
    async fn parse_optional_json<T: DeserializeOwned>(response: Response) -> Result<Option<T>> {
        let text = response
            .text()
            .await
            .map_err(ApiError::from)
            .context("Failed to read response body")?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| ApiError::InvalidResponse(e.to_string()).into())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let (builder, carries_credential) = self.authenticated(Method::GET, path);
        let response = self.dispatch(builder, carries_credential).await?;
        Self::parse_json(response).await
    }

    async fn send_json<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<Option<T>> {
        let (builder, carries_credential) = self.authenticated(method, path);
        let response = self.dispatch(builder.json(body), carries_credential).await?;
        Self::parse_optional_json(response).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let (builder, carries_credential) = self.authenticated(Method::DELETE, path);
        self.dispatch(builder, carries_credential).await?;
        Ok(())
    }

    // ===== Session =====

    /// Exchange credentials for a session token. Does not persist it.
    pub async fn login(&self, request: &LoginRequest) -> Result<LoginResponse> {
        request.validate().map_err(ApiError::from)?;

        let builder = self.anonymous(Method::POST, "/login").json(request);
        let response = self.dispatch(builder, false).await?;
        let login: LoginResponse = Self::parse_json(response).await?;

        login
            .validate()
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        info!(login = %request.login, "Login accepted");
        Ok(login)
    }

    /// Create an account
    pub async fn register(&self, request: &RegisterRequest) -> Result<Option<User>> {
        request.validate().map_err(ApiError::from)?;

        let builder = self.anonymous(Method::POST, "/users").json(request);
        let response = self.dispatch(builder, false).await?;
        info!(login = %request.login, "Account registered");
        Self::parse_optional_json(response).await
    }

    // ===== Products =====

    pub async fn list_products(&self) -> Result<Vec<Product>> {
        self.get("/products").await
    }

    pub async fn create_product(&self, input: &ProductInput) -> Result<Option<Product>> {
        input.validate().map_err(ApiError::from)?;
        self.send_json(Method::POST, "/products", input).await
    }

    pub async fn update_product(&self, id: i64, input: &ProductInput) -> Result<Option<Product>> {
        input.validate().map_err(ApiError::from)?;
        self.send_json(Method::PUT, &format!("/products/{}", id), input)
            .await
    }

    pub async fn delete_product(&self, id: i64) -> Result<()> {
        self.delete(&format!("/products/{}", id)).await
    }

    // ===== Orders =====

    pub async fn list_orders(&self) -> Result<Vec<Order>> {
        self.get("/orders").await
    }

    pub async fn create_order(&self, input: &OrderInput) -> Result<Option<Order>> {
        input.validate().map_err(ApiError::from)?;
        self.send_json(Method::POST, "/orders", input).await
    }

    pub async fn update_order(&self, id: i64, input: &OrderInput) -> Result<Option<Order>> {
        input.validate().map_err(ApiError::from)?;
        self.send_json(Method::PUT, &format!("/orders/{}", id), input)
            .await
    }

    pub async fn delete_order(&self, id: i64) -> Result<()> {
        self.delete(&format!("/orders/{}", id)).await
    }

    // ===== Users =====

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.get("/users").await
    }
}
