//! Webhook intake: payload trust protocol and event extraction.
//!
//! This module is transport-agnostic; the HTTP layer hands over a header
//! map and the raw body, and receives either a [`WebhookEvent`] or a
//! rejection that maps onto an HTTP status. Keeping the logic out of the
//! server frame makes the trust protocol testable without sockets.
//!
//! # Payload trust protocol
//!
//! The `X-Hub-Signature` header carries `sha1=<hex>` over the raw body,
//! keyed with the configured webhook secret:
//!
//! - signature present, no secret configured: reject;
//! - secret configured, no signature present: reject;
//! - both present: constant-time HMAC-SHA1 comparison, reject on
//!   mismatch;
//! - neither present: accept unsigned (lenient mode).

use std::collections::HashMap;

use bytes::Bytes;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use subtle::ConstantTimeEq;
use tracing::info;

use crate::error::WebhookError;
use crate::events::WebhookEvent;
use crate::secrets::SecretString;

type HmacSha1 = Hmac<Sha1>;

const SIGNATURE_PREFIX: &str = "sha1=";

/// Raw HTTP webhook delivery data.
///
/// Header keys are matched case-insensitively.
#[derive(Debug, Clone)]
pub struct WebhookRequest {
    headers: HashMap<String, String>,
    body: Bytes,
}

impl WebhookRequest {
    /// Wrap the parts of an incoming delivery.
    pub fn new(headers: HashMap<String, String>, body: Bytes) -> Self {
        Self { headers, body }
    }

    /// The `X-GitHub-Event` header.
    pub fn event_type(&self) -> Option<&str> {
        self.header("x-github-event")
    }

    /// The `X-GitHub-Delivery` header.
    pub fn delivery_id(&self) -> Option<&str> {
        self.header("x-github-delivery")
    }

    /// The `X-Hub-Signature` header.
    pub fn signature(&self) -> Option<&str> {
        self.header("x-hub-signature")
    }

    /// The raw payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.body
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Immediate response for a webhook delivery.
///
/// The acknowledgement is produced before handlers run; dispatch proceeds
/// concurrently with the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookResponse {
    /// 200 - event accepted and scheduled.
    Accepted { message: String },

    /// 403 - the payload trust protocol rejected the delivery.
    Forbidden { message: String },

    /// 400 - headers or body did not yield a valid event.
    BadRequest { message: String },
}

impl WebhookResponse {
    /// The HTTP status code for this response.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Accepted { .. } => 200,
            Self::Forbidden { .. } => 403,
            Self::BadRequest { .. } => 400,
        }
    }

    /// The response body text.
    pub fn message(&self) -> &str {
        match self {
            Self::Accepted { message }
            | Self::Forbidden { message }
            | Self::BadRequest { message } => message,
        }
    }

    /// Map an intake failure onto the response it owes the sender.
    pub fn from_error(webhook_error: &WebhookError) -> Self {
        match webhook_error {
            WebhookError::Event(event_error) => Self::BadRequest {
                message: format!("Invalid webhook event: {event_error}"),
            },
            other => Self::Forbidden {
                message: other.to_string(),
            },
        }
    }
}

/// The fixed acknowledgement body for an accepted delivery.
pub fn acknowledgement(event: &WebhookEvent) -> String {
    format!(
        "OK: GitHub event received and scheduled for processing. It is {} ({:?})",
        event.name(),
        event,
    )
}

/// Verify a delivery against the payload trust protocol.
pub fn verify_signature(
    secret: Option<&SecretString>,
    signature: Option<&str>,
    body: &[u8],
) -> Result<(), WebhookError> {
    match (secret, signature) {
        (None, None) => Ok(()),
        (None, Some(_)) => Err(WebhookError::SecretNotConfigured),
        (Some(_), None) => Err(WebhookError::SignatureMissing),
        (Some(secret), Some(signature)) => {
            let claimed = parse_signature(signature)?;
            let computed = compute_hmac(secret, body)?;
            if bool::from(claimed.ct_eq(&computed)) {
                Ok(())
            } else {
                Err(WebhookError::SignatureMismatch)
            }
        }
    }
}

/// Run the trust protocol and extract the event record.
pub fn receive_event(
    request: &WebhookRequest,
    secret: Option<&SecretString>,
) -> Result<WebhookEvent, WebhookError> {
    verify_signature(secret, request.signature(), request.payload())?;

    let event = WebhookEvent::from_http_parts(&request.headers, &request.body)?;
    info!(
        event_type = %event.name(),
        delivery_id = %event.delivery_id(),
        signed = request.signature().is_some(),
        "Got a valid X-GitHub-Event"
    );
    Ok(event)
}

fn parse_signature(signature: &str) -> Result<Vec<u8>, WebhookError> {
    let hex_digest =
        signature
            .strip_prefix(SIGNATURE_PREFIX)
            .ok_or_else(|| WebhookError::MalformedSignature {
                message: format!("signature must start with {SIGNATURE_PREFIX:?}"),
            })?;

    hex::decode(hex_digest).map_err(|e| WebhookError::MalformedSignature {
        message: format!("invalid hex encoding in signature: {e}"),
    })
}

fn compute_hmac(secret: &SecretString, body: &[u8]) -> Result<Vec<u8>, WebhookError> {
    let mut mac = HmacSha1::new_from_slice(secret.reveal().as_bytes()).map_err(|e| {
        WebhookError::MalformedSignature {
            message: format!("failed to key HMAC: {e}"),
        }
    })?;
    mac.update(body);
    Ok(mac.finalize().into_bytes().to_vec())
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
