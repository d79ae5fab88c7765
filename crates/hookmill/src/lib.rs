//! # Hookmill
//!
//! Framework for building GitHub integrations that run either as a
//! long-lived GitHub App webhook server or as a one-shot GitHub Action
//! workflow step, with the same handlers in both modes.
//!
//! The crate provides:
//! - webhook intake with HMAC-SHA1 payload verification
//! - GitHub App authentication (RS256 JWTs, installation access tokens
//!   with expiry-based refresh)
//! - predicate-based event routing with three handler scheduling modes
//! - a request-scoped runtime context handed to every handler
//! - a dual-mode dispatcher unifying the server and workflow paths
//!
//! # Examples
//!
//! ## Registering a handler
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use hookmill::error::HandlerError;
//! use hookmill::events::WebhookEvent;
//! use hookmill::routing::{ConcurrentRouter, EventHandler, EventRouter};
//! use hookmill::runtime::RuntimeContext;
//!
//! struct GreetNewIssues;
//!
//! #[async_trait]
//! impl EventHandler for GreetNewIssues {
//!     async fn handle(
//!         &self,
//!         event: &WebhookEvent,
//!         ctx: &RuntimeContext,
//!     ) -> Result<(), HandlerError> {
//!         let api = ctx.app_installation_client.get().map_err(HandlerError::failed)?;
//!         let issue_url = event.payload()["issue"]["comments_url"]
//!             .as_str()
//!             .unwrap_or_default()
//!             .to_owned();
//!         api.post(
//!             &issue_url,
//!             Some(&serde_json::json!({"body": "Thanks for the report!"})),
//!             None,
//!         )
//!         .await
//!         .map_err(HandlerError::failed)?;
//!         Ok(())
//!     }
//! }
//!
//! let router = ConcurrentRouter::new();
//! router.routes().register_when("issues", "action", "opened", Arc::new(GreetNewIssues));
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod entities;
pub mod error;
pub mod events;
pub mod outcomes;
pub mod routing;
pub mod runtime;
pub mod secrets;
pub mod webhook;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types at crate root for convenience
pub use auth::{GitHubToken, PrivateKey, StaticTokenSource, TokenSource};
pub use client::RawGitHubClient;
pub use config::{BotConfig, RunMode};
pub use dispatch::route_github_event;
pub use entities::{AppInstallation, EventSource, GitHubAction, GitHubApp, Installation};
pub use error::{
    ApiError, AuthError, ConfigError, ContextLookupError, DispatchError, EventError, HandlerError,
    WebhookError,
};
pub use events::{Event, WebhookEvent};
pub use outcomes::ActionOutcome;
pub use routing::{
    ConcurrentRouter, EventHandler, EventRouter, NonBlockingConcurrentRouter, SequentialRouter,
};
pub use runtime::RuntimeContext;
pub use secrets::{SecretString, SuperSecretString};
