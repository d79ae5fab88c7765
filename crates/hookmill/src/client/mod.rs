//! A very low-level GitHub REST API client.
//!
//! [`RawGitHubClient`] speaks plain JSON against `https://api.github.com`
//! with a pre-configured credential. It resolves its token through a
//! [`TokenSource`] once per request, so a refreshing source (an
//! installation entity) can swap tokens underneath it without the client
//! noticing.
//!
//! Every verb accepts an optional *preview API version*: GitHub gates some
//! endpoints behind unstable media types, opted into per request with
//! `Accept: application/vnd.github.<version>-preview+json`. The opt-in is
//! applied in one place, the shared request path, so it behaves the same
//! for single-shot calls and paginated ones.

pub mod pagination;

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use reqwest::header::{ACCEPT, AUTHORIZATION, LINK, USER_AGENT};
use reqwest::{Method, StatusCode};
use serde_json::Value;

use crate::auth::TokenSource;
use crate::error::ApiError;

pub use pagination::{parse_link_header, Pagination};

/// GitHub REST API base URL.
pub const GITHUB_API_BASE_URL: &str = "https://api.github.com";

/// Default media type for non-preview requests.
const DEFAULT_ACCEPT: &str = "application/vnd.github+json";

/// Token-aware low-level GitHub API client.
#[derive(Clone)]
pub struct RawGitHubClient {
    http: reqwest::Client,
    tokens: Option<Arc<dyn TokenSource>>,
    user_agent: String,
    base_url: String,
}

impl RawGitHubClient {
    /// Client bound to a token source.
    pub fn new(
        http: reqwest::Client,
        tokens: Arc<dyn TokenSource>,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            http,
            tokens: Some(tokens),
            user_agent: user_agent.into(),
            base_url: GITHUB_API_BASE_URL.to_owned(),
        }
    }

    /// Client without a credential.
    ///
    /// Only useful against endpoints that accept anonymous calls; kept so
    /// callers can build the client first and learn about the missing
    /// token from its diagnostics rather than a panic.
    pub fn unauthenticated(http: reqwest::Client, user_agent: impl Into<String>) -> Self {
        Self {
            http,
            tokens: None,
            user_agent: user_agent.into(),
            base_url: GITHUB_API_BASE_URL.to_owned(),
        }
    }

    /// Override the API base URL (tests point this at a local stub).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Whether a token source is configured.
    pub fn is_initialized(&self) -> bool {
        self.tokens.is_some()
    }

    /// The configured user agent.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// GET a single resource.
    pub async fn getitem(
        &self,
        url: &str,
        preview_api_version: Option<&str>,
    ) -> Result<Value, ApiError> {
        let (_, _, body) = self
            .request(Method::GET, url, None, preview_api_version)
            .await?;
        decode_body(&body)
    }

    /// GET a collection, following `Link: rel="next"` until exhausted.
    ///
    /// Accepts both bare-array responses and the `{"total_count": …,
    /// "items": […]}` wrapping some list endpoints use.
    pub async fn getiter(
        &self,
        url: &str,
        preview_api_version: Option<&str>,
    ) -> Result<Vec<Value>, ApiError> {
        let mut items = Vec::new();
        let mut next_url = Some(url.to_owned());

        while let Some(url) = next_url {
            let (_, headers, body) = self
                .request(Method::GET, &url, None, preview_api_version)
                .await?;

            let page = decode_body(&body)?;
            match page {
                Value::Array(page_items) => items.extend(page_items),
                Value::Object(mut map) => match map.remove("items") {
                    Some(Value::Array(page_items)) => items.extend(page_items),
                    _ => {
                        return Err(ApiError::HttpError {
                            status: 200,
                            message: "expected a list response".to_owned(),
                        })
                    }
                },
                _ => {
                    return Err(ApiError::HttpError {
                        status: 200,
                        message: "expected a list response".to_owned(),
                    })
                }
            }

            let link = headers
                .get(LINK)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned);
            next_url = parse_link_header(link.as_deref()).next;
        }

        Ok(items)
    }

    /// POST a JSON body (or empty body) and decode the response.
    pub async fn post(
        &self,
        url: &str,
        data: Option<&Value>,
        preview_api_version: Option<&str>,
    ) -> Result<Value, ApiError> {
        let (_, _, body) = self
            .request(Method::POST, url, data, preview_api_version)
            .await?;
        decode_body(&body)
    }

    /// PATCH a JSON body and decode the response.
    pub async fn patch(
        &self,
        url: &str,
        data: Option<&Value>,
        preview_api_version: Option<&str>,
    ) -> Result<Value, ApiError> {
        let (_, _, body) = self
            .request(Method::PATCH, url, data, preview_api_version)
            .await?;
        decode_body(&body)
    }

    /// PUT a JSON body and decode the response.
    pub async fn put(
        &self,
        url: &str,
        data: Option<&Value>,
        preview_api_version: Option<&str>,
    ) -> Result<Value, ApiError> {
        let (_, _, body) = self
            .request(Method::PUT, url, data, preview_api_version)
            .await?;
        decode_body(&body)
    }

    /// DELETE a resource.
    pub async fn delete(
        &self,
        url: &str,
        preview_api_version: Option<&str>,
    ) -> Result<Value, ApiError> {
        let (_, _, body) = self
            .request(Method::DELETE, url, None, preview_api_version)
            .await?;
        decode_body(&body)
    }

    /// The single request path every verb goes through.
    ///
    /// Resolves the token, applies the preview media opt-in, and maps
    /// non-success statuses to [`ApiError::HttpError`].
    async fn request(
        &self,
        method: Method,
        url: &str,
        data: Option<&Value>,
        preview_api_version: Option<&str>,
    ) -> Result<(StatusCode, reqwest::header::HeaderMap, Bytes), ApiError> {
        let url = self.resolve_url(url);

        let mut request = self
            .http
            .request(method, url)
            .header(ACCEPT, accept_media_type(preview_api_version))
            .header(USER_AGENT, &self.user_agent);

        if let Some(tokens) = &self.tokens {
            let token = tokens.current_token().await?;
            request = request.header(AUTHORIZATION, token.authorization_value());
        }

        if let Some(data) = data {
            request = request.json(data);
        }

        let response = request.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(ApiError::HttpError {
                status: status.as_u16(),
                message: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok((status, headers, body))
    }

    fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_owned()
        } else {
            format!("{}{}", self.base_url, url)
        }
    }
}

impl fmt::Debug for RawGitHubClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_initialized() {
            return write!(f, "RawGitHubClient(<UNINITIALIZED>)");
        }
        write!(
            f,
            "RawGitHubClient(token=<SECRET>, user_agent={:?})",
            self.user_agent
        )
    }
}

/// The `Accept` value for a request, honoring the preview opt-in.
fn accept_media_type(preview_api_version: Option<&str>) -> String {
    match preview_api_version {
        Some(version) => format!("application/vnd.github.{version}-preview+json"),
        None => DEFAULT_ACCEPT.to_owned(),
    }
}

/// Decode a response body, mapping the empty body to JSON `null`.
fn decode_body(body: &[u8]) -> Result<Value, ApiError> {
    if body.is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(body)?)
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
