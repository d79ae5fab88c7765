//! GitHub App installation entity and access-token handling.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use crate::auth::{GitHubToken, TokenSource};
use crate::client::RawGitHubClient;
use crate::error::ApiError;
use crate::secrets::SecretString;

/// The preview media type gating the installation endpoints.
pub(crate) const MACHINE_MAN_PREVIEW: &str = "machine-man";

/// Which repositories an installation covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepositorySelection {
    All,
    Selected,
}

/// The kind of account an App is installed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetType {
    Organization,
    User,
}

/// Installation metadata as returned by the GitHub API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Installation {
    /// Installation id: the unique combination of an App and an account.
    pub id: u64,
    /// The owning GitHub App id.
    pub app_id: u64,
    /// Target account (org or user) the App is installed into.
    pub account: Map<String, Value>,
    /// Webhook events the installation subscribes to.
    pub events: Vec<String>,
    /// Permission levels granted to the App.
    pub permissions: Map<String, Value>,
    /// Repository selection mode.
    pub repository_selection: RepositorySelection,
    /// Target account id.
    pub target_id: u64,
    /// Target account type.
    pub target_type: TargetType,
    /// Endpoint to retrieve access tokens from.
    pub access_tokens_url: String,
    /// Page for managing the installation.
    pub html_url: String,
    /// Endpoint listing repositories accessible to the installation.
    pub repositories_url: String,
    /// When the App was installed.
    pub created_at: DateTime<Utc>,
    /// When the installation last changed.
    pub updated_at: DateTime<Utc>,
    /// Single file path the App controls, if the permission is granted.
    #[serde(default)]
    pub single_file_name: Option<String>,
    #[serde(default)]
    pub suspended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub suspended_by: Option<Map<String, Value>>,
}

/// Short-lived installation access token response.
#[derive(Debug, Clone, Deserialize)]
pub struct InstallationAccessToken {
    /// The token value.
    pub token: SecretString,
    /// Expiry instant; tokens are refreshed past this point.
    pub expires_at: DateTime<Utc>,
    /// Permission levels the token carries.
    #[serde(default)]
    pub permissions: Map<String, Value>,
    /// Repository selection mode of the token.
    #[serde(default)]
    pub repository_selection: Option<RepositorySelection>,
    /// Accessible repositories, when selection is `selected`.
    #[serde(default)]
    pub repositories: Option<Vec<Value>>,
}

impl InstallationAccessToken {
    /// Whether this token has expired already.
    pub fn expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

/// A live App installation bound to its parent application.
///
/// Installations are looked up per event and not cached across requests;
/// only the access token is cached, inside the entity, for the entity's
/// lifetime.
pub struct AppInstallation {
    metadata: Installation,
    token_cache: Mutex<Option<InstallationAccessToken>>,
    app_client: RawGitHubClient,
    http: reqwest::Client,
    user_agent: String,
}

impl AppInstallation {
    /// Bind installation metadata to the owning application's JWT client.
    pub fn new(
        metadata: Installation,
        app_client: RawGitHubClient,
        http: reqwest::Client,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            metadata,
            token_cache: Mutex::new(None),
            app_client,
            http,
            user_agent: user_agent.into(),
        }
    }

    /// The installation metadata.
    pub fn metadata(&self) -> &Installation {
        &self.metadata
    }

    /// The installation id.
    pub fn id(&self) -> u64 {
        self.metadata.id
    }

    /// A current OAuth token for this installation.
    ///
    /// Refreshes through `access_tokens_url` (JWT-authenticated, preview
    /// `machine-man`) whenever the cached token is absent or expired.
    pub async fn access_token(&self) -> Result<GitHubToken, ApiError> {
        let mut cache = self.token_cache.lock().await;

        let needs_refresh = cache.as_ref().map_or(true, InstallationAccessToken::expired);
        if needs_refresh {
            let response = self
                .app_client
                .post(
                    &self.metadata.access_tokens_url,
                    None,
                    Some(MACHINE_MAN_PREVIEW),
                )
                .await?;
            let token: InstallationAccessToken = serde_json::from_value(response)?;
            *cache = Some(token);
        }

        let token = cache
            .as_ref()
            .ok_or_else(|| ApiError::HttpError {
                status: 500,
                message: "installation token refresh yielded no token".to_owned(),
            })?
            .token
            .clone();
        Ok(GitHubToken::OAuth(token))
    }

    /// A raw API client acting as this installation.
    ///
    /// The client resolves its token through [`AppInstallation::access_token`]
    /// before every request, so a request never goes out with a stale
    /// token.
    pub fn api_client(self: &Arc<Self>) -> RawGitHubClient {
        let source = InstallationTokenSource {
            installation: Arc::clone(self),
        };
        RawGitHubClient::new(self.http.clone(), Arc::new(source), self.user_agent.clone())
    }
}

impl std::fmt::Debug for AppInstallation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppInstallation")
            .field("id", &self.metadata.id)
            .field("app_id", &self.metadata.app_id)
            .field("target_type", &self.metadata.target_type)
            .finish()
    }
}

/// Token source performing the expiry-checked refresh.
struct InstallationTokenSource {
    installation: Arc<AppInstallation>,
}

#[async_trait]
impl TokenSource for InstallationTokenSource {
    async fn current_token(&self) -> Result<GitHubToken, ApiError> {
        self.installation.access_token().await
    }
}

#[cfg(test)]
#[path = "installation_tests.rs"]
mod tests;
