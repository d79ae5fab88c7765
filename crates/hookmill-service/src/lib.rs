//! # Hookmill HTTP service
//!
//! The webhook-receiving frame around the [`hookmill`] framework: a
//! single-endpoint axum application that authenticates GitHub deliveries,
//! acknowledges them, and hands them to the dispatcher as detached tasks.

pub mod action;
pub mod server;

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use hookmill::config::BotConfig;
use hookmill::dispatch::route_and_report;
use hookmill::entities::{EventSource, GitHubApp};
use hookmill::webhook::{acknowledgement, receive_event, WebhookRequest, WebhookResponse};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// The GitHub App receiving the events.
    pub github_app: Arc<GitHubApp>,

    /// Resolved configuration, seeded into each request's context.
    pub config: Arc<BotConfig>,
}

/// Build the webhook application.
///
/// One endpoint, `POST /`. The method router answers anything else with
/// `405` and an `Allow: POST` header.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", post(handle_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// The webhook endpoint.
///
/// Verifies the delivery, constructs the event record, spawns the
/// dispatch as a detached task, and acknowledges immediately. Handlers
/// run concurrently with (not before) the response; GitHub's delivery
/// timeout never waits on user code.
async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = WebhookRequest::new(plain_headers(&headers), body);

    let secret = state.github_app.webhook_secret();
    match receive_event(&request, secret) {
        Ok(event) => {
            let body = acknowledgement(&event);

            let source: Arc<dyn EventSource> = state.github_app.clone();
            tokio::spawn(route_and_report(event, source, Some(Arc::clone(&state.config))));

            (StatusCode::OK, body).into_response()
        }
        Err(webhook_error) => {
            info!(
                event_type = ?request.event_type(),
                delivery_id = ?request.delivery_id(),
                signature = ?request.signature(),
                error = %webhook_error,
                "Got an invalid X-GitHub-Event"
            );
            let response = WebhookResponse::from_error(&webhook_error);
            let status = StatusCode::from_u16(response.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, response.message().to_owned()).into_response()
        }
    }
}

/// Lower an axum header map into the transport-agnostic form.
fn plain_headers(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_owned(), value.to_owned()))
        })
        .collect()
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
