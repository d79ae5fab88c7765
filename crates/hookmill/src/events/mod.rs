//! Canonical GitHub event records.
//!
//! Two immutable forms exist: [`Event`] is the source-agnostic
//! `(name, payload)` record used inside workflow runs and fixtures, and
//! [`WebhookEvent`] additionally carries the UUIDv4 delivery id GitHub
//! assigns to every HTTP delivery.

pub mod fixture;

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::EventError;

/// JSON object payload of a GitHub event.
pub type EventPayload = Map<String, Value>;

/// A source-agnostic GitHub event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    name: String,
    payload: EventPayload,
}

impl Event {
    /// Build an event from a name and an object payload.
    ///
    /// # Errors
    ///
    /// Rejects empty event names; every dispatched event must carry one.
    pub fn new(name: impl Into<String>, payload: EventPayload) -> Result<Self, EventError> {
        let name = name.into();
        if name.is_empty() {
            return Err(EventError::EmptyEventName);
        }
        Ok(Self { name, payload })
    }

    /// Build an event from a name and any JSON value.
    ///
    /// # Errors
    ///
    /// Rejects payloads that are not JSON objects.
    pub fn from_json(name: impl Into<String>, payload: Value) -> Result<Self, EventError> {
        match payload {
            Value::Object(map) => Self::new(name, map),
            _ => Err(EventError::PayloadNotAnObject),
        }
    }

    /// Read an event payload from a JSON file, as found in
    /// `GITHUB_EVENT_PATH` inside a workflow run.
    pub fn from_file(
        event_name: impl Into<String>,
        event_path: impl AsRef<Path>,
    ) -> Result<Self, EventError> {
        let contents = std::fs::read_to_string(event_path)?;
        let payload: Value = serde_json::from_str(&contents)?;
        Self::from_json(event_name, payload)
    }

    /// Parse an event from a serialized fixture.
    ///
    /// See [`fixture`] for the accepted formats. `event` overrides the
    /// event name when the fixture carries none; supplying both is an
    /// error.
    pub fn from_fixture(text: &str, event: Option<&str>) -> Result<Self, EventError> {
        let (headers, payload) = fixture::parse(text)?;
        let name = fixture::resolve_event_name(&headers, event)?;
        Self::from_json(name, payload)
    }

    /// Parse an event from a fixture file on disk.
    pub fn from_fixture_file(
        path: impl AsRef<Path>,
        event: Option<&str>,
    ) -> Result<Self, EventError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_fixture(&contents, event)
    }

    /// Serialize this event as a fixture.
    pub fn to_fixture(&self) -> String {
        fixture::render(&self.name, None, &self.payload)
    }

    /// Event name, e.g. `pull_request`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Decoded payload object.
    pub fn payload(&self) -> &EventPayload {
        &self.payload
    }

    /// Promote to a webhook-form event by minting a fresh delivery id.
    ///
    /// Used when an event that did not arrive over HTTP (a workflow file
    /// event, a fixture) enters the dispatch path, which operates on the
    /// webhook form.
    pub fn into_webhook(self) -> WebhookEvent {
        WebhookEvent {
            name: self.name,
            payload: self.payload,
            delivery_id: Uuid::new_v4(),
        }
    }
}

/// A GitHub event that arrived as an HTTP webhook delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEvent {
    name: String,
    payload: EventPayload,
    delivery_id: Uuid,
}

impl WebhookEvent {
    /// Build a webhook event, validating the delivery id.
    ///
    /// # Errors
    ///
    /// Rejects empty names, and delivery ids that are not version 4
    /// UUIDs.
    pub fn new(
        name: impl Into<String>,
        payload: EventPayload,
        delivery_id: Uuid,
    ) -> Result<Self, EventError> {
        let name = name.into();
        if name.is_empty() {
            return Err(EventError::EmptyEventName);
        }
        validate_delivery_id(&delivery_id)?;
        Ok(Self {
            name,
            payload,
            delivery_id,
        })
    }

    /// Build a webhook event from HTTP headers and a raw body.
    ///
    /// Header keys are matched case-insensitively. The body must decode
    /// to a JSON object.
    pub fn from_http_parts(
        headers: &HashMap<String, String>,
        body: &[u8],
    ) -> Result<Self, EventError> {
        let name = header_value(headers, "x-github-event")
            .ok_or(EventError::MissingHeader {
                name: "X-GitHub-Event",
            })?
            .to_owned();
        let delivery = header_value(headers, "x-github-delivery").ok_or(
            EventError::MissingHeader {
                name: "X-GitHub-Delivery",
            },
        )?;
        let delivery_id = parse_delivery_id(delivery)?;

        let payload: Value = serde_json::from_slice(body)?;
        let payload = match payload {
            Value::Object(map) => map,
            _ => return Err(EventError::PayloadNotAnObject),
        };

        Self::new(name, payload, delivery_id)
    }

    /// Parse a webhook event from a serialized fixture.
    ///
    /// Missing fixture headers are filled with fallback values (including
    /// a fresh delivery id) and the resulting header set is validated the
    /// way a real delivery would be.
    pub fn from_fixture(text: &str, event: Option<&str>) -> Result<Self, EventError> {
        let (mut headers, payload) = fixture::parse(text)?;
        let name = fixture::resolve_event_name(&headers, event)?;
        headers.insert("x-github-event".to_owned(), name);
        fixture::augment_http_headers(&mut headers);
        fixture::validate_http_headers(&headers)?;

        let name = headers["x-github-event"].clone();
        let delivery_id = parse_delivery_id(&headers["x-github-delivery"])?;
        let payload = match payload {
            Value::Object(map) => map,
            _ => return Err(EventError::PayloadNotAnObject),
        };
        Self::new(name, payload, delivery_id)
    }

    /// Parse a webhook event from a fixture file on disk.
    pub fn from_fixture_file(
        path: impl AsRef<Path>,
        event: Option<&str>,
    ) -> Result<Self, EventError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_fixture(&contents, event)
    }

    /// Serialize this event as a fixture, delivery id included.
    pub fn to_fixture(&self) -> String {
        fixture::render(&self.name, Some(&self.delivery_id), &self.payload)
    }

    /// Event name, e.g. `pull_request`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Decoded payload object.
    pub fn payload(&self) -> &EventPayload {
        &self.payload
    }

    /// The UUIDv4 assigned to this delivery by GitHub.
    pub fn delivery_id(&self) -> &Uuid {
        &self.delivery_id
    }

    /// The `installation.id` reference in the payload, if any.
    pub fn installation_id(&self) -> Option<u64> {
        self.payload
            .get("installation")
            .and_then(|install| install.get("id"))
            .and_then(Value::as_u64)
    }
}

/// Case-insensitive header lookup.
fn header_value<'h>(headers: &'h HashMap<String, String>, name: &str) -> Option<&'h str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

fn parse_delivery_id(value: &str) -> Result<Uuid, EventError> {
    let uuid = Uuid::parse_str(value).map_err(|e| EventError::InvalidDeliveryId {
        message: e.to_string(),
    })?;
    validate_delivery_id(&uuid)?;
    Ok(uuid)
}

fn validate_delivery_id(uuid: &Uuid) -> Result<(), EventError> {
    if uuid.get_version_num() != 4 {
        return Err(EventError::InvalidDeliveryId {
            message: format!("expected a version 4 UUID, got version {}", uuid.get_version_num()),
        });
    }
    Ok(())
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
