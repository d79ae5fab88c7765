//! One-shot event processing for GitHub Action workflow runs.
//!
//! Reads the single event the runner wrote to disk, pushes it through the
//! shared dispatcher, and translates the result into the process exit
//! code GitHub's runner understands: `0` success, `78` neutral, anything
//! else failure.

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info};

use hookmill::config::BotConfig;
use hookmill::dispatch::route_github_event;
use hookmill::entities::{EventSource, GitHubAction};
use hookmill::error::{ConfigError, DispatchError, EventError, HandlerError};
use hookmill::outcomes::ActionOutcome;
use hookmill::routing::EventRouter;

/// Failures while running the Action processing itself.
#[derive(Debug, Error)]
pub enum ActionRunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Event(#[from] EventError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Process the workflow run's event.
///
/// Returns the outcome the process should terminate with; distinguished
/// handler outcomes surface through the error channel and are translated
/// by [`run_action`].
pub async fn process_action(
    config: Arc<BotConfig>,
    event_routers: Vec<Arc<dyn EventRouter>>,
) -> Result<ActionOutcome, ActionRunError> {
    info!("Processing GitHub Action event...");

    let http = reqwest::Client::new();
    let action = Arc::new(GitHubAction::new(
        &config.action,
        config.runtime.user_agent(),
        http,
        event_routers,
    )?);

    let event = action.event()?.into_webhook();
    let source: Arc<dyn EventSource> = action;
    route_github_event(&event, source, Some(config)).await?;

    Ok(ActionOutcome::success("GitHub Action has been processed"))
}

/// Run the Action processing and produce the process exit code.
///
/// Processing races the runner's interrupt signal; an interrupt cancels
/// the in-flight dispatch (dropping it at its next suspension point) and
/// exits neutral.
pub async fn run_action(
    config: Arc<BotConfig>,
    event_routers: Vec<Arc<dyn EventRouter>>,
) -> i32 {
    run_action_until(config, event_routers, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}

/// [`run_action`] with an explicit interrupt future.
///
/// When `interrupt` wins the race, the dropped processing future is
/// surfaced as [`DispatchError::Cancelled`] so the exit-code translation
/// sees cancellation as a value rather than silence.
pub async fn run_action_until(
    config: Arc<BotConfig>,
    event_routers: Vec<Arc<dyn EventRouter>>,
    interrupt: impl Future<Output = ()>,
) -> i32 {
    let result = tokio::select! {
        result = process_action(config, event_routers) => result,
        () = interrupt => {
            info!("Interrupted");
            Err(ActionRunError::Dispatch(DispatchError::Cancelled))
        }
    };

    match result {
        Ok(outcome) => outcome.into_exit_code(),
        Err(action_error) => exit_code_for_error(action_error),
    }
}

/// Translate a processing failure into an exit code.
///
/// Handler-signalled outcomes keep their own codes; cancellation is the
/// neutral outcome; everything else is an unexpected failure reported to
/// the crash sink and exiting `1`.
fn exit_code_for_error(action_error: ActionRunError) -> i32 {
    match action_error {
        ActionRunError::Dispatch(DispatchError::Handler(HandlerError::Outcome(outcome))) => {
            outcome.into_exit_code()
        }
        ActionRunError::Dispatch(DispatchError::Cancelled) => {
            ActionOutcome::neutral("Action processing interrupted by user").into_exit_code()
        }
        other => {
            sentry::capture_error(&other);
            error!(error = %other, "Action processing failed unexpectedly");
            ActionOutcome::failure("Action processing failed unexpectedly").into_exit_code()
        }
    }
}

#[cfg(test)]
#[path = "action_tests.rs"]
mod tests;
