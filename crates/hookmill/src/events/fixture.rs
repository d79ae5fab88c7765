//! Serialized event fixtures.
//!
//! A fixture is one or two JSON documents, one per line:
//!
//! - a single document: the event payload object (the event name must then
//!   be supplied out of band);
//! - two documents: an HTTP-header object (lowercase keys) followed by the
//!   payload object.
//!
//! Missing headers are filled with fallback values before validation so a
//! hand-written fixture behaves like a real delivery.

use std::collections::HashMap;

use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::EventError;

/// Fallback `User-Agent` recorded in generated fixtures.
const FALLBACK_USER_AGENT: &str = "GitHub-Hookshot/fallback-value";

/// Split a fixture into its header map and payload document.
pub fn parse(text: &str) -> Result<(HashMap<String, String>, Value), EventError> {
    let mut documents = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        documents.push(serde_json::from_str::<Value>(line).map_err(|e| {
            EventError::InvalidFixture {
                message: format!("fixture line is not valid JSON: {e}"),
            }
        })?);
    }

    match documents.len() {
        1 => {
            let payload = documents.pop().expect("length checked");
            ensure_object(&payload)?;
            Ok((HashMap::new(), payload))
        }
        2 => {
            let payload = documents.pop().expect("length checked");
            let headers = documents.pop().expect("length checked");
            ensure_object(&payload)?;
            Ok((headers_from_value(headers)?, payload))
        }
        count => Err(EventError::InvalidFixture {
            message: format!("fixture must contain 1-2 JSON documents, found {count}"),
        }),
    }
}

/// Resolve the event name from the fixture headers and the optional
/// caller-supplied override.
///
/// Exactly one source must provide the name.
pub fn resolve_event_name(
    headers: &HashMap<String, String>,
    event: Option<&str>,
) -> Result<String, EventError> {
    let header_name = headers.get("x-github-event");
    match (event, header_name) {
        (Some(_), Some(_)) => Err(EventError::InvalidFixture {
            message: "supply only one of an event name or an event header in the fixture"
                .to_owned(),
        }),
        (Some(name), None) => Ok(name.to_owned()),
        (None, Some(name)) => Ok(name.clone()),
        (None, None) => Err(EventError::MissingHeader {
            name: "X-GitHub-Event",
        }),
    }
}

/// Fill fallback values for the header positions a fixture may omit.
pub fn augment_http_headers(headers: &mut HashMap<String, String>) {
    headers
        .entry("content-type".to_owned())
        .or_insert_with(|| "application/json".to_owned());
    headers
        .entry("user-agent".to_owned())
        .or_insert_with(|| FALLBACK_USER_AGENT.to_owned());
    headers
        .entry("x-github-delivery".to_owned())
        .or_insert_with(|| Uuid::new_v4().to_string());
}

/// Verify that a delivery's headers look sane.
pub fn validate_http_headers(headers: &HashMap<String, String>) -> Result<(), EventError> {
    if headers.get("content-type").map(String::as_str) != Some("application/json") {
        return Err(EventError::InvalidFixture {
            message: "Content-Type must be 'application/json'".to_owned(),
        });
    }

    let user_agent = headers.get("user-agent").map(String::as_str).unwrap_or("");
    if !user_agent.starts_with("GitHub-Hookshot/") {
        return Err(EventError::InvalidFixture {
            message: "User-Agent must start with 'GitHub-Hookshot/'".to_owned(),
        });
    }

    let delivery = headers
        .get("x-github-delivery")
        .ok_or(EventError::MissingHeader {
            name: "X-GitHub-Delivery",
        })?;
    let uuid = Uuid::parse_str(delivery).map_err(|e| EventError::InvalidDeliveryId {
        message: e.to_string(),
    })?;
    if uuid.get_version_num() != 4 {
        return Err(EventError::InvalidDeliveryId {
            message: "X-GitHub-Delivery must be of type UUID4".to_owned(),
        });
    }

    match headers.get("x-github-event") {
        Some(name) if !name.is_empty() => Ok(()),
        _ => Err(EventError::MissingHeader {
            name: "X-GitHub-Event",
        }),
    }
}

/// Render an event as a two-document fixture.
pub fn render(
    name: &str,
    delivery_id: Option<&Uuid>,
    payload: &serde_json::Map<String, Value>,
) -> String {
    let mut headers = json!({
        "content-type": "application/json",
        "user-agent": FALLBACK_USER_AGENT,
        "x-github-event": name,
    });
    if let Some(id) = delivery_id {
        headers["x-github-delivery"] = Value::String(id.to_string());
    }

    format!(
        "{}\n{}\n",
        serde_json::to_string(&headers).expect("header map serializes"),
        serde_json::to_string(&Value::Object(payload.clone())).expect("payload serializes"),
    )
}

fn ensure_object(value: &Value) -> Result<(), EventError> {
    if value.is_object() {
        Ok(())
    } else {
        Err(EventError::PayloadNotAnObject)
    }
}

fn headers_from_value(value: Value) -> Result<HashMap<String, String>, EventError> {
    let map = match value {
        Value::Object(map) => map,
        _ => {
            return Err(EventError::InvalidFixture {
                message: "fixture header document must be a JSON object".to_owned(),
            })
        }
    };

    let mut headers = HashMap::with_capacity(map.len());
    for (key, value) in map {
        let value = match value {
            Value::String(s) => s,
            other => {
                return Err(EventError::InvalidFixture {
                    message: format!("header {key} must be a string, got {other}"),
                })
            }
        };
        headers.insert(key.to_ascii_lowercase(), value);
    }
    Ok(headers)
}

#[cfg(test)]
#[path = "fixture_tests.rs"]
mod tests;
