//! The GitHub App entity: credentials, installation lookup, and event
//! fan-out.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use crate::auth::{GitHubToken, PrivateKey, TokenSource};
use crate::client::{RawGitHubClient, GITHUB_API_BASE_URL};
use crate::config::GitHubAppConfig;
use crate::entities::installation::{
    AppInstallation, Installation, MACHINE_MAN_PREVIEW,
};
use crate::entities::EventSource;
use crate::error::{ApiError, AuthError, ConfigError, DispatchError};
use crate::events::WebhookEvent;
use crate::routing::{dispatch_via, EventRouter};
use crate::runtime::RuntimeContext;
use crate::secrets::SecretString;

/// GitHub App wrapper owning the app-level credentials and the bound
/// event routers.
pub struct GitHubApp {
    app_id: u64,
    private_key: PrivateKey,
    webhook_secret: Option<SecretString>,
    user_agent: String,
    http: reqwest::Client,
    routers: Vec<Arc<dyn EventRouter>>,
    base_url: String,
}

impl GitHubApp {
    /// Build the App from its resolved configuration.
    ///
    /// Logs whether webhook signature verification will be enforced, the
    /// same way operators are used to reading it off the startup log.
    pub fn new(
        config: &GitHubAppConfig,
        user_agent: impl Into<String>,
        http: reqwest::Client,
        routers: Vec<Arc<dyn EventRouter>>,
    ) -> Result<Self, ConfigError> {
        let app_id = config.app_id.ok_or(ConfigError::MissingVar {
            name: "GITHUB_APP_IDENTIFIER",
        })?;
        let private_key = config
            .private_key
            .clone()
            .ok_or(ConfigError::MissingVar {
                name: "GITHUB_PRIVATE_KEY",
            })?;

        match &config.webhook_secret {
            Some(_) => info!("Webhook secret is SET. SIGNATURE VERIFICATION WILL BE ENFORCED"),
            None => info!("Webhook secret is NOT SET"),
        }

        Ok(Self {
            app_id,
            private_key,
            webhook_secret: config.webhook_secret.clone(),
            user_agent: user_agent.into(),
            http,
            routers,
            base_url: GITHUB_API_BASE_URL.to_owned(),
        })
    }

    /// Override the API base URL (tests point this at a local stub).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// The numeric App id.
    pub fn app_id(&self) -> u64 {
        self.app_id
    }

    /// The App's private key.
    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }

    /// The configured webhook secret, if signed mode is enabled.
    pub fn webhook_secret(&self) -> Option<&SecretString> {
        self.webhook_secret.as_ref()
    }

    /// The API user agent.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Mint a fresh App JWT, valid for 60 seconds.
    pub fn jwt(&self) -> Result<GitHubToken, AuthError> {
        let token = self.private_key.make_jwt(self.app_id)?;
        Ok(GitHubToken::jwt(token))
    }

    /// Fetch one installation by id.
    ///
    /// Installations are deliberately not cached; a fresh entity is built
    /// per lookup so stale metadata cannot leak between events.
    pub async fn get_installation_by_id(
        &self,
        installation_id: u64,
    ) -> Result<Arc<AppInstallation>, ApiError> {
        let response = self
            .api_client()
            .getitem(
                &format!("/app/installations/{installation_id}"),
                Some(MACHINE_MAN_PREVIEW),
            )
            .await?;
        let metadata: Installation = serde_json::from_value(response)?;
        Ok(self.bind_installation(metadata))
    }

    /// Enumerate every installation of this App.
    pub async fn get_installations(&self) -> Result<Vec<Arc<AppInstallation>>, ApiError> {
        let items = self
            .api_client()
            .getiter("/app/installations", Some(MACHINE_MAN_PREVIEW))
            .await?;

        let mut installations = Vec::with_capacity(items.len());
        for item in items {
            let metadata: Installation = serde_json::from_value(item)?;
            installations.push(self.bind_installation(metadata));
        }
        Ok(installations)
    }

    /// Best-effort installations listing for the startup log.
    ///
    /// A GitHub connectivity problem at startup is not fatal; it is
    /// logged and the server starts anyway.
    pub async fn log_installs_list(&self) {
        match self.get_installations().await {
            Ok(installations) => {
                info!("This GitHub App is installed into:");
                for installation in installations {
                    let account_login = installation
                        .metadata()
                        .account
                        .get("login")
                        .and_then(serde_json::Value::as_str)
                        .unwrap_or("<unknown>");
                    info!(
                        "* Installation id {} (installed to {})",
                        installation.id(),
                        account_login,
                    );
                }
            }
            Err(api_error) => {
                info!("It looks like the GitHub API is offline...");
                error!(
                    error = %api_error,
                    "Failed to grab the installations list"
                );
            }
        }
    }

    fn bind_installation(&self, metadata: Installation) -> Arc<AppInstallation> {
        Arc::new(AppInstallation::new(
            metadata,
            self.api_client(),
            self.http.clone(),
            self.user_agent.clone(),
        ))
    }
}

#[async_trait]
impl EventSource for GitHubApp {
    fn is_action(&self) -> bool {
        false
    }

    /// A raw client authenticating with a fresh App JWT per request.
    fn api_client(&self) -> RawGitHubClient {
        let source = AppJwtTokenSource {
            private_key: self.private_key.clone(),
            app_id: self.app_id,
        };
        RawGitHubClient::new(self.http.clone(), Arc::new(source), self.user_agent.clone())
            .with_base_url(self.base_url.clone())
    }

    async fn get_installation(
        &self,
        event: &WebhookEvent,
    ) -> Result<Arc<AppInstallation>, ApiError> {
        let installation_id = event
            .installation_id()
            .ok_or(ApiError::MissingInstallation)?;
        self.get_installation_by_id(installation_id).await
    }

    async fn dispatch_event(
        &self,
        event: &WebhookEvent,
        ctx: &RuntimeContext,
    ) -> Result<(), DispatchError> {
        dispatch_via(&self.routers, event, ctx).await
    }
}

/// Token source minting a short-lived App JWT for every request.
struct AppJwtTokenSource {
    private_key: PrivateKey,
    app_id: u64,
}

#[async_trait]
impl TokenSource for AppJwtTokenSource {
    async fn current_token(&self) -> Result<GitHubToken, ApiError> {
        let token = self.private_key.make_jwt(self.app_id)?;
        Ok(GitHubToken::jwt(token))
    }
}

#[cfg(test)]
#[path = "app_tests.rs"]
mod tests;
