//! Tests for route registration and emission.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::json;

use super::*;
use crate::error::HandlerError;
use crate::test_support::test_event;

/// Handler that records its label into a shared log.
struct Recorder {
    label: &'static str,
    log: Arc<Mutex<Vec<&'static str>>>,
}

impl Recorder {
    fn new(label: &'static str, log: &Arc<Mutex<Vec<&'static str>>>) -> HandlerRef {
        Arc::new(Self {
            label,
            log: Arc::clone(log),
        })
    }
}

#[async_trait]
impl EventHandler for Recorder {
    async fn handle(
        &self,
        _event: &WebhookEvent,
        _ctx: &RuntimeContext,
    ) -> Result<(), HandlerError> {
        self.log.lock().unwrap().push(self.label);
        Ok(())
    }
}

fn emitted_labels(registry: &RouteRegistry, name: &str, payload: serde_json::Value) -> usize {
    let event = test_event(name, payload);
    registry.emit(event.name(), event.payload()).len()
}

#[test]
fn test_shallow_routes_match_on_name_only() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let registry = RouteRegistry::new();
    registry.register("issues", Recorder::new("a", &log));

    assert_eq!(emitted_labels(&registry, "issues", json!({})), 1);
    assert_eq!(
        emitted_labels(&registry, "issues", json!({"action": "anything"})),
        1
    );
    assert_eq!(emitted_labels(&registry, "pull_request", json!({})), 0);
}

#[test]
fn test_deep_routes_match_on_discriminator() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let registry = RouteRegistry::new();
    registry.register_when("issues", "action", "opened", Recorder::new("a", &log));

    assert_eq!(
        emitted_labels(&registry, "issues", json!({"action": "opened"})),
        1
    );
    assert_eq!(
        emitted_labels(&registry, "issues", json!({"action": "closed"})),
        0
    );
    // Discriminator key absent from the payload.
    assert_eq!(emitted_labels(&registry, "issues", json!({})), 0);
    // Same discriminator, different event name.
    assert_eq!(
        emitted_labels(&registry, "pull_request", json!({"action": "opened"})),
        0
    );
}

#[test]
fn test_emission_order_is_shallow_then_deep_in_registration_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let registry = RouteRegistry::new();

    registry.register_when("issues", "action", "opened", Recorder::new("deep-1", &log));
    registry.register("issues", Recorder::new("shallow-1", &log));
    registry.register_when("issues", "action", "opened", Recorder::new("deep-2", &log));
    registry.register("issues", Recorder::new("shallow-2", &log));

    let event = test_event("issues", json!({"action": "opened"}));
    let emitted = registry.emit(event.name(), event.payload());
    assert_eq!(emitted.len(), 4);

    // Run them sequentially to observe the order through the log.
    let ctx = RuntimeContext::new();
    futures::executor::block_on(async {
        for handler in emitted {
            handler.handle(&event, &ctx).await.unwrap();
        }
    });
    assert_eq!(
        *log.lock().unwrap(),
        vec!["shallow-1", "shallow-2", "deep-1", "deep-2"]
    );
}

#[test]
fn test_duplicate_registration_fires_once_per_registration() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let registry = RouteRegistry::new();
    let handler = Recorder::new("dup", &log);

    registry.register("issues", Arc::clone(&handler));
    registry.register("issues", handler);

    assert_eq!(emitted_labels(&registry, "issues", json!({})), 2);
}

#[test]
fn test_register_actions_expands_to_one_route_per_value() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let registry = RouteRegistry::new();
    registry.register_actions(
        "check_run",
        &["created", "rerequested"],
        Recorder::new("a", &log),
    );

    assert_eq!(
        emitted_labels(&registry, "check_run", json!({"action": "created"})),
        1
    );
    assert_eq!(
        emitted_labels(&registry, "check_run", json!({"action": "rerequested"})),
        1
    );
    assert_eq!(
        emitted_labels(&registry, "check_run", json!({"action": "completed"})),
        0
    );
}

#[test]
fn test_non_string_discriminator_values_compare_canonically() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let registry = RouteRegistry::new();
    registry.register_when("workflow_job", "run_attempt", "2", Recorder::new("a", &log));

    assert_eq!(
        emitted_labels(&registry, "workflow_job", json!({"run_attempt": 2})),
        1
    );
    assert_eq!(
        emitted_labels(&registry, "workflow_job", json!({"run_attempt": 3})),
        0
    );
}

#[tokio::test]
async fn test_dispatch_via_fans_out_to_all_routers() {
    struct Counting {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl EventHandler for Counting {
        async fn handle(
            &self,
            _event: &WebhookEvent,
            _ctx: &RuntimeContext,
        ) -> Result<(), HandlerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    let calls = Arc::new(AtomicUsize::new(0));
    let routers: Vec<Arc<dyn EventRouter>> = vec![
        Arc::new(crate::routing::SequentialRouter::new()),
        Arc::new(crate::routing::ConcurrentRouter::new()),
    ];
    for router in &routers {
        router.routes().register(
            "ping",
            Arc::new(Counting {
                calls: Arc::clone(&calls),
            }),
        );
    }

    let event = test_event("ping", json!({}));
    let ctx = RuntimeContext::new();
    dispatch_via(&routers, &event, &ctx).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
