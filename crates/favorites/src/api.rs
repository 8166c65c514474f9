//! Remote favorites API client.
//!
//! `FavoritesApi` is the seam the store talks through; `HttpFavoritesApi` is
//! the production implementation over the storefront REST endpoints:
//!
//! | Operation | Method | Path |
//! |---|---|---|
//! | add | POST | `/favoritos/agregar-favorito` |
//! | remove | POST | `/favoritos/eliminar-favorito` |
//! | list by user | GET | `/favoritos/obtener-favoritos/{userId}` |
//! | list current session | GET | `/favoritos/obtener-favoritos` |

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, Url};
use serde_json::Value;
use storefront_core::UserId;

use crate::config::{FavoritesConfig, RetryPolicy};
use crate::error::ApiError;
use crate::types::{FavoriteRecord, FavoriteRequest};

const ADD_PATH: &[&str] = &["favoritos", "agregar-favorito"];
const REMOVE_PATH: &[&str] = &["favoritos", "eliminar-favorito"];
const LIST_PATH: &[&str] = &["favoritos", "obtener-favoritos"];

/// Remote persistence of favorites.
#[async_trait]
pub trait FavoritesApi: Send + Sync {
    /// Add a favorite. Returns the server-defined payload.
    async fn add_favorite(&self, request: &FavoriteRequest) -> Result<Value, ApiError>;

    /// Remove a favorite. Returns the server-defined payload.
    async fn remove_favorite(&self, request: &FavoriteRequest) -> Result<Value, ApiError>;

    /// List the favorites of `user_id`.
    async fn favorites_for_user(&self, user_id: &UserId) -> Result<Vec<FavoriteRecord>, ApiError>;

    /// List the favorites of the user the server associates with this session.
    async fn current_favorites(&self) -> Result<Vec<FavoriteRecord>, ApiError>;
}

/// `FavoritesApi` over HTTP/JSON using `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFavoritesApi {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
    retry: RetryPolicy,
    request_timeout: Duration,
}

impl HttpFavoritesApi {
    pub fn new(config: &FavoritesConfig) -> Result<Self, ApiError> {
        let base_url = Url::parse(&config.api_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {e}", config.api_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(config.api_url.clone()));
        }

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ApiError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            token: None,
            retry: config.retry,
            request_timeout: config.request_timeout,
        })
    }

    /// Attach a bearer token to every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send a request, retrying transient failures with exponential backoff.
    ///
    /// Returns the body of the first 2xx response.
    async fn send(&self, method: Method, url: Url, body: Option<&FavoriteRequest>) -> Result<String, ApiError> {
        let mut attempt = 0;
        loop {
            match self.send_once(method.clone(), url.clone(), body).await {
                Ok(text) => {
                    tracing::debug!(%method, %url, attempt = attempt + 1, "favorites request succeeded");
                    return Ok(text);
                }
                Err(err) if err.is_transient() && attempt < self.retry.max_retries => {
                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(
                        %method,
                        %url,
                        attempt = attempt + 1,
                        error = %err,
                        "favorites request failed, retrying in {delay:?}"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn send_once(&self, method: Method, url: Url, body: Option<&FavoriteRequest>) -> Result<String, ApiError> {
        let mut req = self.client.request(method, url);
        if let Some(body) = body {
            req = req.json(body);
        }
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await.map_err(|e| self.transport_error(e))?;
        let status = resp.status();
        let text = resp.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            return Err(ApiError::Api(status.as_u16(), text));
        }
        Ok(text)
    }

    fn transport_error(&self, err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            ApiError::Timeout(self.request_timeout)
        } else {
            ApiError::Network(err.to_string())
        }
    }

    async fn post_change(&self, path: &[&str], request: &FavoriteRequest) -> Result<Value, ApiError> {
        let url = self.endpoint(path)?;
        let text = self.send(Method::POST, url, Some(request)).await?;
        parse_payload(&text)
    }

    async fn get_listing(&self, url: Url) -> Result<Vec<FavoriteRecord>, ApiError> {
        let text = self.send(Method::GET, url, None).await?;
        serde_json::from_str(&text).map_err(|e| ApiError::Parse(e.to_string()))
    }
}

#[async_trait]
impl FavoritesApi for HttpFavoritesApi {
    async fn add_favorite(&self, request: &FavoriteRequest) -> Result<Value, ApiError> {
        self.post_change(ADD_PATH, request).await
    }

    async fn remove_favorite(&self, request: &FavoriteRequest) -> Result<Value, ApiError> {
        self.post_change(REMOVE_PATH, request).await
    }

    async fn favorites_for_user(&self, user_id: &UserId) -> Result<Vec<FavoriteRecord>, ApiError> {
        let mut segments = LIST_PATH.to_vec();
        segments.push(user_id.as_str());
        let url = self.endpoint(&segments)?;
        self.get_listing(url).await
    }

    async fn current_favorites(&self) -> Result<Vec<FavoriteRecord>, ApiError> {
        let url = self.endpoint(LIST_PATH)?;
        self.get_listing(url).await
    }
}

/// Add/remove answers are server-defined; an empty body is accepted as `null`.
fn parse_payload(text: &str) -> Result<Value, ApiError> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(text).map_err(|e| ApiError::Parse(e.to_string()))
}
