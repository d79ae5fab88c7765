//! The GitHub Action entity: the workflow-run flavor of an event source.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::auth::{GitHubToken, StaticTokenSource};
use crate::client::RawGitHubClient;
use crate::config::ActionConfig;
use crate::entities::installation::AppInstallation;
use crate::entities::EventSource;
use crate::error::{ApiError, ConfigError, DispatchError, EventError};
use crate::events::{Event, WebhookEvent};
use crate::routing::{dispatch_via, EventRouter};
use crate::runtime::RuntimeContext;
use crate::secrets::SuperSecretString;

/// GitHub Action wrapper around the runner-injected environment.
///
/// Inside a workflow run there is no App key and no installation lookup;
/// GitHub injects a ready-made access token and writes the single event
/// to a file.
pub struct GitHubAction {
    event_name: String,
    event_path: PathBuf,
    token: SuperSecretString,
    user_agent: String,
    http: reqwest::Client,
    routers: Vec<Arc<dyn EventRouter>>,
}

impl GitHubAction {
    /// Build the Action from the workflow-run configuration.
    ///
    /// # Errors
    ///
    /// The event name, event path, and token are injected by the runner
    /// and must all be present.
    pub fn new(
        config: &ActionConfig,
        user_agent: impl Into<String>,
        http: reqwest::Client,
        routers: Vec<Arc<dyn EventRouter>>,
    ) -> Result<Self, ConfigError> {
        let event_name = config.event_name.clone().ok_or(ConfigError::MissingVar {
            name: "GITHUB_EVENT_NAME",
        })?;
        let event_path = config.event_path.clone().ok_or(ConfigError::MissingVar {
            name: "GITHUB_EVENT_PATH",
        })?;
        let token = config
            .token
            .clone()
            .ok_or(ConfigError::MissingVar {
                name: "GITHUB_TOKEN",
            })?;

        Ok(Self {
            event_name,
            event_path,
            token,
            user_agent: user_agent.into(),
            http,
            routers,
        })
    }

    /// The workflow access token.
    pub fn token(&self) -> GitHubToken {
        GitHubToken::WorkflowOAuth(self.token.clone())
    }

    /// Read the workflow's event from its file.
    pub fn event(&self) -> Result<Event, EventError> {
        Event::from_file(&self.event_name, &self.event_path)
    }
}

#[async_trait]
impl EventSource for GitHubAction {
    fn is_action(&self) -> bool {
        true
    }

    /// A raw client authenticating with the workflow token.
    fn api_client(&self) -> RawGitHubClient {
        let source = StaticTokenSource::new(self.token());
        RawGitHubClient::new(self.http.clone(), Arc::new(source), self.user_agent.clone())
    }

    /// Workflow events carry no installation reference to resolve.
    async fn get_installation(
        &self,
        _event: &WebhookEvent,
    ) -> Result<Arc<AppInstallation>, ApiError> {
        Err(ApiError::MissingInstallation)
    }

    async fn dispatch_event(
        &self,
        event: &WebhookEvent,
        ctx: &RuntimeContext,
    ) -> Result<(), DispatchError> {
        dispatch_via(&self.routers, event, ctx).await
    }
}

#[cfg(test)]
#[path = "action_tests.rs"]
mod tests;
