//! Tests for the event records.

use std::collections::HashMap;

use serde_json::{json, Map};
use uuid::Uuid;

use super::*;
use crate::error::EventError;

fn object(value: serde_json::Value) -> EventPayload {
    match value {
        serde_json::Value::Object(map) => map,
        _ => panic!("expected an object"),
    }
}

#[test]
fn test_event_requires_a_name() {
    let rejected = Event::new("", Map::new());
    assert!(matches!(rejected, Err(EventError::EmptyEventName)));
}

#[test]
fn test_event_payload_must_be_an_object() {
    let rejected = Event::from_json("push", json!(["not", "an", "object"]));
    assert!(matches!(rejected, Err(EventError::PayloadNotAnObject)));
}

#[test]
fn test_webhook_event_requires_a_v4_delivery_id() {
    // A nil UUID is version 0.
    let rejected = WebhookEvent::new("ping", Map::new(), Uuid::nil());
    assert!(matches!(rejected, Err(EventError::InvalidDeliveryId { .. })));

    let accepted = WebhookEvent::new("ping", Map::new(), Uuid::new_v4());
    assert!(accepted.is_ok());
}

#[test]
fn test_from_http_parts() {
    let delivery_id = Uuid::new_v4();
    let headers = HashMap::from([
        ("X-GitHub-Event".to_owned(), "check_run".to_owned()),
        ("X-GitHub-Delivery".to_owned(), delivery_id.to_string()),
    ]);
    let body = br#"{"action":"created"}"#;

    let event = WebhookEvent::from_http_parts(&headers, body).unwrap();
    assert_eq!(event.name(), "check_run");
    assert_eq!(event.delivery_id(), &delivery_id);
    assert_eq!(event.payload()["action"], json!("created"));
}

#[test]
fn test_from_http_parts_headers_are_case_insensitive() {
    let headers = HashMap::from([
        ("x-github-event".to_owned(), "ping".to_owned()),
        ("x-github-delivery".to_owned(), Uuid::new_v4().to_string()),
    ]);
    assert!(WebhookEvent::from_http_parts(&headers, b"{}").is_ok());
}

#[test]
fn test_from_http_parts_requires_event_header() {
    let headers = HashMap::from([(
        "X-GitHub-Delivery".to_owned(),
        Uuid::new_v4().to_string(),
    )]);
    let rejected = WebhookEvent::from_http_parts(&headers, b"{}");
    assert!(matches!(
        rejected,
        Err(EventError::MissingHeader {
            name: "X-GitHub-Event"
        })
    ));
}

#[test]
fn test_from_http_parts_rejects_non_object_bodies() {
    let headers = HashMap::from([
        ("X-GitHub-Event".to_owned(), "push".to_owned()),
        ("X-GitHub-Delivery".to_owned(), Uuid::new_v4().to_string()),
    ]);
    let rejected = WebhookEvent::from_http_parts(&headers, b"[1, 2, 3]");
    assert!(matches!(rejected, Err(EventError::PayloadNotAnObject)));
}

#[test]
fn test_event_fixture_round_trip() {
    let event = Event::new("push", object(json!({"ref": "refs/heads/main"}))).unwrap();
    let restored = Event::from_fixture(&event.to_fixture(), None).unwrap();
    assert_eq!(restored, event);
}

#[test]
fn test_webhook_event_fixture_round_trip() {
    let event = WebhookEvent::new(
        "issues",
        object(json!({"action": "opened"})),
        Uuid::new_v4(),
    )
    .unwrap();
    let restored = WebhookEvent::from_fixture(&event.to_fixture(), None).unwrap();
    assert_eq!(restored, event);
}

#[test]
fn test_fixture_name_override_conflicts_with_header() {
    let event = Event::new("push", Map::new()).unwrap();
    let rejected = Event::from_fixture(&event.to_fixture(), Some("issues"));
    assert!(matches!(rejected, Err(EventError::InvalidFixture { .. })));
}

#[test]
fn test_payload_only_fixture_needs_a_name() {
    let fixture = r#"{"action":"opened"}"#;

    let rejected = Event::from_fixture(fixture, None);
    assert!(matches!(
        rejected,
        Err(EventError::MissingHeader {
            name: "X-GitHub-Event"
        })
    ));

    let event = Event::from_fixture(fixture, Some("issues")).unwrap();
    assert_eq!(event.name(), "issues");
}

#[test]
fn test_webhook_fixture_mints_missing_delivery_id() {
    let fixture = r#"{"action":"opened"}"#;
    let event = WebhookEvent::from_fixture(fixture, Some("issues")).unwrap();
    assert_eq!(event.delivery_id().get_version_num(), 4);
}

#[test]
fn test_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let event_path = dir.path().join("event.json");
    std::fs::write(&event_path, r#"{"action":"qwerty"}"#).unwrap();

    let event = Event::from_file("neutral_event", &event_path).unwrap();
    assert_eq!(event.name(), "neutral_event");
    assert_eq!(event.payload()["action"], json!("qwerty"));
}

#[test]
fn test_into_webhook_mints_a_v4_delivery_id() {
    let event = Event::new("push", Map::new()).unwrap();
    let webhook = event.clone().into_webhook();
    assert_eq!(webhook.name(), "push");
    assert_eq!(webhook.delivery_id().get_version_num(), 4);
}

#[test]
fn test_installation_id_extraction() {
    let with = object(json!({"installation": {"id": 12345}}));
    let event = WebhookEvent::new("issues", with, Uuid::new_v4()).unwrap();
    assert_eq!(event.installation_id(), Some(12345));

    let without = WebhookEvent::new("ping", Map::new(), Uuid::new_v4()).unwrap();
    assert_eq!(without.installation_id(), None);
}
