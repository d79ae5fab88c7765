//! Error types for the framework.
//!
//! One enum per failure family, mirroring the error taxonomy of the
//! subsystems: configuration, app credentials, event intake, webhook
//! verification, GitHub API transport, and dispatch.

use thiserror::Error;

use crate::outcomes::ActionOutcome;

/// Boxed error type handlers are allowed to fail with.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Startup configuration errors.
///
/// All of these surface before the process starts serving; they abort
/// startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable required by the current run mode is not set.
    #[error("required environment variable {name} is not set")]
    MissingVar { name: &'static str },

    /// A variable is set but its value cannot be used.
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: &'static str, message: String },

    /// The pinned private-key fingerprint does not match the loaded key.
    #[error("private key fingerprint mismatch: pinned {pinned}, computed {computed}")]
    FingerprintMismatch { pinned: String, computed: String },

    /// The environment could not be deserialized at all.
    #[error("environment parsing failed: {0}")]
    Environment(#[from] envy::Error),

    /// The configured private key failed to load.
    #[error(transparent)]
    PrivateKey(#[from] AuthError),
}

/// GitHub App credential errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The PEM data is not a parseable RSA private key.
    #[error("invalid private key: {message}")]
    InvalidPrivateKey { message: String },

    /// JWT validity window larger than GitHub's 10 minute maximum.
    #[error("JWT time offset of {requested} seconds exceeds the 600 second maximum")]
    JwtValidityTooLong { requested: u64 },

    /// The RS256 signing operation failed.
    #[error("JWT generation failed: {message}")]
    JwtGenerationFailed { message: String },
}

/// Errors constructing an event record.
#[derive(Debug, Error)]
pub enum EventError {
    /// Event payloads are JSON objects; anything else is rejected.
    #[error("event payload must be a JSON object")]
    PayloadNotAnObject,

    /// Dispatched events must carry a name.
    #[error("event name must not be empty")]
    EmptyEventName,

    /// The delivery id is not a version 4 UUID.
    #[error("delivery id must be a UUIDv4: {message}")]
    InvalidDeliveryId { message: String },

    /// A required HTTP header is absent.
    #[error("missing required header {name}")]
    MissingHeader { name: &'static str },

    /// A fixture file does not follow the expected structure.
    #[error("invalid event fixture: {message}")]
    InvalidFixture { message: String },

    /// The event source file could not be read.
    #[error("failed to read event file: {0}")]
    Io(#[from] std::io::Error),

    /// The payload is not valid JSON.
    #[error("failed to decode event payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Webhook delivery rejections.
///
/// Every variant except `Event` maps to an HTTP 403; `Event` maps to 400.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// A signature header arrived but no secret is configured.
    #[error("received a signed delivery but no webhook secret is configured")]
    SecretNotConfigured,

    /// A secret is configured but the delivery carries no signature.
    #[error("webhook secret is configured but the delivery is unsigned")]
    SignatureMissing,

    /// The `X-Hub-Signature` header is not `sha1=<40 hex digits>`.
    #[error("malformed signature header: {message}")]
    MalformedSignature { message: String },

    /// The HMAC-SHA1 digest does not match the payload.
    #[error("payload signature mismatch")]
    SignatureMismatch,

    /// The delivery headers or body did not yield a valid event.
    #[error(transparent)]
    Event(#[from] EventError),
}

/// GitHub REST API errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Non-success HTTP response from GitHub.
    #[error("GitHub API error: {status} - {message}")]
    HttpError { status: u16, message: String },

    /// Network, TLS, or protocol failure.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Response body could not be decoded.
    #[error("failed to decode API response: {0}")]
    Json(#[from] serde_json::Error),

    /// The event payload carries no `installation.id` reference.
    ///
    /// Application-wide events (`ping`, `security_advisory`, ...) are
    /// delivered outside of any installation; callers are expected to
    /// treat this as a recoverable lookup miss.
    #[error("this event occurred outside of an installation")]
    MissingInstallation,

    /// A JWT could not be minted for the request.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Errors returned by user-supplied event handlers.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// A distinguished Action control-flow outcome.
    ///
    /// Propagated through the router and the dispatcher untouched so the
    /// Action runner can translate it into an exit code.
    #[error("action outcome: {0}")]
    Outcome(ActionOutcome),

    /// Any other handler failure.
    #[error("handler failed: {0}")]
    Failed(#[source] BoxError),
}

impl From<ActionOutcome> for HandlerError {
    fn from(outcome: ActionOutcome) -> Self {
        Self::Outcome(outcome)
    }
}

impl HandlerError {
    /// Wrap an arbitrary error as a handler failure.
    pub fn failed<E>(error: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Failed(error.into())
    }
}

/// Errors surfacing from event dispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A handler signalled an Action control-flow outcome.
    #[error(transparent)]
    Handler(#[from] HandlerError),

    /// The dispatch was cancelled before completing.
    ///
    /// Produced when an interrupt wins the race against an in-flight
    /// dispatch (the Action runner maps the dropped processing future to
    /// this value) or when a detached handler task is torn down early.
    /// Never reported to the crash sink; cancellation is part of normal
    /// shutdown.
    #[error("event dispatch was cancelled")]
    Cancelled,

    /// Installation lookup or token acquisition failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The event record itself was unusable.
    #[error(transparent)]
    Event(#[from] EventError),
}

impl DispatchError {
    /// The Action outcome carried by this error, if any.
    pub fn outcome(&self) -> Option<&ActionOutcome> {
        match self {
            Self::Handler(HandlerError::Outcome(outcome)) => Some(outcome),
            _ => None,
        }
    }

    /// Whether this error should be forwarded to the crash sink.
    ///
    /// Outcomes are control flow and cancellation is shutdown noise; both
    /// are excluded.
    pub fn is_reportable(&self) -> bool {
        !matches!(self, Self::Cancelled | Self::Handler(HandlerError::Outcome(_)))
    }
}

/// Read of an unset runtime context slot.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("no `{slot}` present in the context")]
pub struct ContextLookupError {
    /// Name of the slot that was read.
    pub slot: &'static str,
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
