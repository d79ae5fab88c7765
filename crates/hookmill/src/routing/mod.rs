//! Event routing: predicate registration and callback emission.
//!
//! Handlers are registered against an event name (*shallow* routes) or an
//! event name plus a payload discriminator such as `action = "created"`
//! (*deep* routes). [`RouteRegistry::emit`] resolves the handlers matching
//! a concrete event; the [routers](crate::routing::routers) decide how the
//! emitted handlers are scheduled.

pub mod routers;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::Value;

use crate::error::{DispatchError, HandlerError};
use crate::events::{EventPayload, WebhookEvent};
use crate::runtime::RuntimeContext;

pub use routers::{ConcurrentRouter, NonBlockingConcurrentRouter, SequentialRouter};

/// A user-supplied event callback.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Process one event within its runtime context.
    async fn handle(
        &self,
        event: &WebhookEvent,
        ctx: &RuntimeContext,
    ) -> Result<(), HandlerError>;
}

/// Shared handle to a registered handler.
pub type HandlerRef = Arc<dyn EventHandler>;

/// Routes registered under one discriminator key of one event name.
///
/// Both the key list and the per-value handler lists preserve insertion
/// order; emission order is part of the routing contract.
struct DeepKeyRoutes {
    key: String,
    values: Vec<(String, Vec<HandlerRef>)>,
}

#[derive(Default)]
struct RouteMap {
    shallow: HashMap<String, Vec<HandlerRef>>,
    deep: HashMap<String, Vec<DeepKeyRoutes>>,
}

/// Registration and emission surface shared by every router flavor.
///
/// Registration is idempotent in the permissive sense: registering the
/// same handler twice makes it fire once per registration.
#[derive(Default)]
pub struct RouteRegistry {
    routes: RwLock<RouteMap>,
}

impl RouteRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for every event with the given name.
    pub fn register(&self, event_name: &str, handler: HandlerRef) {
        let mut routes = self.routes.write().expect("route lock poisoned");
        routes
            .shallow
            .entry(event_name.to_owned())
            .or_default()
            .push(handler);
    }

    /// Register a handler gated on `payload[key] == value`.
    pub fn register_when(&self, event_name: &str, key: &str, value: &str, handler: HandlerRef) {
        let mut routes = self.routes.write().expect("route lock poisoned");
        let key_routes = routes.deep.entry(event_name.to_owned()).or_default();

        let key_index = match key_routes.iter().position(|routes| routes.key == key) {
            Some(index) => index,
            None => {
                key_routes.push(DeepKeyRoutes {
                    key: key.to_owned(),
                    values: Vec::new(),
                });
                key_routes.len() - 1
            }
        };
        let by_key = &mut key_routes[key_index];

        match by_key
            .values
            .iter()
            .position(|(existing, _)| existing.as_str() == value)
        {
            Some(index) => by_key.values[index].1.push(handler),
            None => by_key.values.push((value.to_owned(), vec![handler])),
        }
    }

    /// Register a handler for several `action` values at once.
    ///
    /// Equivalent to one [`RouteRegistry::register_when`] call per value
    /// with the discriminator key `action`.
    pub fn register_actions(&self, event_name: &str, actions: &[&str], handler: HandlerRef) {
        for action in actions {
            self.register_when(event_name, "action", action, Arc::clone(&handler));
        }
    }

    /// Handlers matching the given event, in emission order.
    ///
    /// Shallow routes come first in registration order, followed by deep
    /// routes whose discriminator matches the payload, again in
    /// registration order.
    pub fn emit(&self, event_name: &str, payload: &EventPayload) -> Vec<HandlerRef> {
        let routes = self.routes.read().expect("route lock poisoned");
        let mut matched = Vec::new();

        if let Some(handlers) = routes.shallow.get(event_name) {
            matched.extend(handlers.iter().cloned());
        }

        if let Some(key_routes) = routes.deep.get(event_name) {
            for by_key in key_routes {
                let Some(event_value) = payload.get(&by_key.key) else {
                    continue;
                };
                for (value, handlers) in &by_key.values {
                    if payload_value_matches(event_value, value) {
                        matched.extend(handlers.iter().cloned());
                    }
                }
            }
        }

        matched
    }
}

/// Compare a payload value against a registered discriminator value.
///
/// Registered values are strings; JSON strings compare directly and any
/// other scalar compares through its canonical rendering.
fn payload_value_matches(event_value: &Value, registered: &str) -> bool {
    match event_value {
        Value::String(s) => s == registered,
        Value::Bool(b) => registered == b.to_string(),
        Value::Number(n) => registered == n.to_string(),
        _ => false,
    }
}

/// An event dispatch scheduling strategy.
#[async_trait]
pub trait EventRouter: Send + Sync {
    /// The registration surface of this router.
    fn routes(&self) -> &RouteRegistry;

    /// Run the handlers matching `event` under this router's scheduling
    /// mode.
    async fn dispatch(
        &self,
        event: &WebhookEvent,
        ctx: &RuntimeContext,
    ) -> Result<(), DispatchError>;
}

/// Fan an event out to several routers, concurrently.
///
/// All routers run to completion; the first error is surfaced afterwards.
pub async fn dispatch_via(
    routers: &[Arc<dyn EventRouter>],
    event: &WebhookEvent,
    ctx: &RuntimeContext,
) -> Result<(), DispatchError> {
    let dispatches = routers.iter().map(|router| router.dispatch(event, ctx));
    let results = join_all(dispatches).await;
    results.into_iter().collect()
}

/// Collapse handler results, surfacing the first error.
pub(crate) fn first_error(
    results: impl IntoIterator<Item = Result<(), HandlerError>>,
) -> Result<(), DispatchError> {
    for result in results {
        result?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
