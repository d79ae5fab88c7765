//! GitHub-side entities: the App, its installations, and the Action
//! runtime.
//!
//! The server path and the workflow path differ in where credentials come
//! from (an RSA key minting JWTs vs. a token injected by the runner), but
//! the dispatcher only needs a small shared surface; [`EventSource`]
//! captures it, and [`GitHubApp`] and [`GitHubAction`] are its two
//! implementations.

pub mod action;
pub mod app;
pub mod installation;

use std::sync::Arc;

use async_trait::async_trait;

use crate::client::RawGitHubClient;
use crate::error::{ApiError, DispatchError};
use crate::events::WebhookEvent;
use crate::runtime::RuntimeContext;

pub use action::GitHubAction;
pub use app::GitHubApp;
pub use installation::{AppInstallation, Installation, InstallationAccessToken};

/// The dispatcher's view of whatever is processing events.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Whether this source is the Action variant.
    fn is_action(&self) -> bool;

    /// The source's own authenticated API client.
    fn api_client(&self) -> RawGitHubClient;

    /// Resolve the installation an event belongs to.
    ///
    /// Fails with [`ApiError::MissingInstallation`] for events delivered
    /// outside of any installation.
    async fn get_installation(
        &self,
        event: &WebhookEvent,
    ) -> Result<Arc<AppInstallation>, ApiError>;

    /// Fan the event out to every bound router.
    async fn dispatch_event(
        &self,
        event: &WebhookEvent,
        ctx: &RuntimeContext,
    ) -> Result<(), DispatchError>;
}
