//! GitHub credential types.
//!
//! Two token kinds exist in the GitHub App world: RS256 JWTs that
//! authenticate the App itself, and OAuth-style access tokens that
//! authenticate a single installation (or a workflow run). They differ
//! only in their HTTP `Authorization` scheme, so both are variants of
//! [`GitHubToken`].

pub mod private_key;

use std::fmt;

use async_trait::async_trait;

use crate::error::ApiError;
use crate::secrets::{SecretString, SuperSecretString};

pub use private_key::PrivateKey;

/// A credential for the GitHub REST API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitHubToken {
    /// App-level JSON Web Token, sent as `Authorization: Bearer <jwt>`.
    Jwt(SecretString),

    /// Installation access token, sent as `Authorization: token <value>`.
    OAuth(SecretString),

    /// Workflow token auto-injected by the Actions runner, sent as
    /// `Authorization: token <value>`.
    ///
    /// Carries the stronger secret class: a leaked workflow token
    /// compromises the run's whole repository scope, so its diagnostics
    /// stand out harder in logs.
    WorkflowOAuth(SuperSecretString),
}

impl GitHubToken {
    /// Wrap an encoded JWT string.
    pub fn jwt(value: impl Into<SecretString>) -> Self {
        Self::Jwt(value.into())
    }

    /// Wrap an installation access token.
    pub fn oauth(value: impl Into<SecretString>) -> Self {
        Self::OAuth(value.into())
    }

    /// Wrap a runner-injected workflow token.
    pub fn workflow_oauth(value: impl Into<SuperSecretString>) -> Self {
        Self::WorkflowOAuth(value.into())
    }

    /// The HTTP authorization scheme for this token kind.
    pub fn scheme(&self) -> &'static str {
        match self {
            Self::Jwt(_) => "Bearer",
            Self::OAuth(_) | Self::WorkflowOAuth(_) => "token",
        }
    }

    /// Direct access to the raw token value.
    pub fn reveal(&self) -> &str {
        match self {
            Self::Jwt(secret) | Self::OAuth(secret) => secret.reveal(),
            Self::WorkflowOAuth(secret) => secret.reveal(),
        }
    }

    /// Full `Authorization` header value.
    pub fn authorization_value(&self) -> String {
        format!("{} {}", self.scheme(), self.reveal())
    }
}

impl fmt::Display for GitHubToken {
    /// Renders the raw token value, as required for header emission.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reveal())
    }
}

/// Capability to produce the current API token.
///
/// The raw client resolves its token through this interface once per
/// request. Static credentials implement it trivially; the installation
/// entity implements it with an expiry-checking refresh so a request never
/// goes out with a stale token.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// The token to authenticate the next request with.
    async fn current_token(&self) -> Result<GitHubToken, ApiError>;
}

/// Token source wrapping a fixed credential.
#[derive(Debug, Clone)]
pub struct StaticTokenSource {
    token: GitHubToken,
}

impl StaticTokenSource {
    /// Wrap a fixed token.
    pub fn new(token: GitHubToken) -> Self {
        Self { token }
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn current_token(&self) -> Result<GitHubToken, ApiError> {
        Ok(self.token.clone())
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
