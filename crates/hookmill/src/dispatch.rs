//! The shared event dispatch entry point.
//!
//! Both ingestion paths end up here: the webhook server hands over events
//! it has already acknowledged, and the Action runner hands over the
//! single event of its workflow run. The dispatcher seeds the
//! [`RuntimeContext`], provisions an installation client when the event
//! belongs to one, and invokes the source's router fan-out.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, warn};

use crate::config::BotConfig;
use crate::entities::EventSource;
use crate::error::{ApiError, DispatchError};
use crate::events::WebhookEvent;
use crate::runtime::RuntimeContext;

/// Grace period before dispatching HTTP-delivered events.
///
/// Webhook deliveries can outrun GitHub's own eventual consistency; by
/// the time a workflow VM has spun up that race is long over, so the
/// Action path skips the wait.
const EVENTUAL_CONSISTENCY_GRACE: Duration = Duration::from_secs(1);

/// Dispatch one GitHub event to the handlers bound to `source`.
///
/// Seeds a fresh request-scoped context:
/// - `github_app`, `github_event`, and the mode flags are always set;
///   `is_github_action` and `is_github_app` are complementary.
/// - On the Action path, `app_installation_client` is the workflow-token
///   client.
/// - On the App path, the event's installation is looked up and its
///   client provisioned. Events outside any installation (`ping`,
///   `security_advisory`, ...) simply proceed without one.
pub async fn route_github_event(
    event: &WebhookEvent,
    source: Arc<dyn EventSource>,
    config: Option<Arc<BotConfig>>,
) -> Result<(), DispatchError> {
    let ctx = RuntimeContext::new();

    let is_action = source.is_action();
    ctx.is_github_action.set(is_action);
    ctx.is_github_app.set(!is_action);
    ctx.github_app.set(Arc::clone(&source));
    ctx.github_event.set(event.clone());
    if let Some(config) = config {
        ctx.config.set(config);
    }

    if is_action {
        ctx.app_installation_client.set(source.api_client());
    } else {
        match source.get_installation(event).await {
            Ok(installation) => {
                ctx.app_installation.set(Arc::clone(&installation));
                ctx.app_installation_client.set(installation.api_client());
            }
            Err(ApiError::MissingInstallation) => {
                // Application-wide event; handlers that need an
                // installation client will find the slot unset.
            }
            Err(lookup_error) => return Err(lookup_error.into()),
        }

        tokio::time::sleep(EVENTUAL_CONSISTENCY_GRACE).await;
    }

    source.dispatch_event(event, &ctx).await
}

/// Server-path wrapper: dispatch, then report instead of propagating.
///
/// By the time this runs the HTTP 200 has already been sent, so there is
/// nobody left to propagate to. Real failures go to the crash sink and
/// the log; Action outcomes and cancellation are control flow and are
/// only logged.
pub async fn route_and_report(
    event: WebhookEvent,
    source: Arc<dyn EventSource>,
    config: Option<Arc<BotConfig>>,
) {
    if let Err(dispatch_error) = route_github_event(&event, source, config).await {
        report_dispatch_error(&dispatch_error, &event);
    }
}

/// Forward a dispatch failure to the crash sink and the log.
pub fn report_dispatch_error(dispatch_error: &DispatchError, event: &WebhookEvent) {
    if dispatch_error.is_reportable() {
        sentry::capture_error(dispatch_error);
        error!(
            event_type = %event.name(),
            delivery_id = %event.delivery_id(),
            error = %dispatch_error,
            "Event processing failed"
        );
    } else {
        warn!(
            event_type = %event.name(),
            delivery_id = %event.delivery_id(),
            error = %dispatch_error,
            "Event processing ended with a control-flow signal"
        );
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
