//! Request-scoped runtime context.
//!
//! Every dispatched event gets its own [`RuntimeContext`]: a record of
//! named slots seeded by the dispatcher and handed to handlers, so the
//! right API client, event, and installation are visible without threading
//! each of them through every function signature. Contexts of concurrent
//! requests are fully independent; background handler tasks receive a
//! [snapshot](RuntimeContext::snapshot) and later writes by the parent are
//! invisible to them.

use std::sync::{Arc, Mutex};

use crate::client::RawGitHubClient;
use crate::config::BotConfig;
use crate::entities::installation::AppInstallation;
use crate::entities::EventSource;
use crate::error::ContextLookupError;
use crate::events::WebhookEvent;

/// A single context slot holding a stack of scoped values.
///
/// `set` shadows the prior value and `reset` restores it, which is what
/// lets nested dispatches temporarily override a slot and tear their write
/// down afterwards. Reading an unset slot is a distinguished error rather
/// than a panic so handlers can probe for optional slots (an event outside
/// an installation has no installation client, for example).
pub struct Slot<T> {
    name: &'static str,
    values: Mutex<Vec<T>>,
}

impl<T: Clone> Slot<T> {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            values: Mutex::new(Vec::new()),
        }
    }

    /// The current value of the slot.
    pub fn get(&self) -> Result<T, ContextLookupError> {
        self.values
            .lock()
            .expect("slot lock poisoned")
            .last()
            .cloned()
            .ok_or(ContextLookupError { slot: self.name })
    }

    /// Set the slot, shadowing any prior value.
    pub fn set(&self, value: T) {
        self.values.lock().expect("slot lock poisoned").push(value);
    }

    /// Remove the current value, restoring the prior one.
    pub fn reset(&self) -> Result<(), ContextLookupError> {
        self.values
            .lock()
            .expect("slot lock poisoned")
            .pop()
            .map(|_| ())
            .ok_or(ContextLookupError { slot: self.name })
    }

    /// Whether the slot currently holds a value.
    pub fn is_set(&self) -> bool {
        !self.values.lock().expect("slot lock poisoned").is_empty()
    }

    fn top(&self) -> Option<T> {
        self.values.lock().expect("slot lock poisoned").last().cloned()
    }

    fn seeded(name: &'static str, value: Option<T>) -> Self {
        Self {
            name,
            values: Mutex::new(value.into_iter().collect()),
        }
    }
}

/// The per-request slot record visible to event handlers.
pub struct RuntimeContext {
    /// Resolved bot configuration.
    pub config: Slot<Arc<BotConfig>>,
    /// The event source (App or Action) this dispatch runs under.
    pub github_app: Slot<Arc<dyn EventSource>>,
    /// The event being dispatched.
    pub github_event: Slot<WebhookEvent>,
    /// The installation the event belongs to, when it has one.
    pub app_installation: Slot<Arc<AppInstallation>>,
    /// Token-authenticated client for acting within the installation.
    pub app_installation_client: Slot<RawGitHubClient>,
    /// True when running under a GitHub Action workflow.
    pub is_github_action: Slot<bool>,
    /// True when running as a long-lived GitHub App server.
    pub is_github_app: Slot<bool>,
}

impl RuntimeContext {
    /// A context with every slot unset.
    pub fn new() -> Self {
        Self {
            config: Slot::new("config"),
            github_app: Slot::new("github_app"),
            github_event: Slot::new("github_event"),
            app_installation: Slot::new("app_installation"),
            app_installation_client: Slot::new("app_installation_client"),
            is_github_action: Slot::new("is_github_action"),
            is_github_app: Slot::new("is_github_app"),
        }
    }

    /// An independent copy of the current slot values.
    ///
    /// Handlers scheduled as detached background tasks receive a snapshot;
    /// mutations the parent performs afterwards do not reach them.
    pub fn snapshot(&self) -> Self {
        Self {
            config: Slot::seeded("config", self.config.top()),
            github_app: Slot::seeded("github_app", self.github_app.top()),
            github_event: Slot::seeded("github_event", self.github_event.top()),
            app_installation: Slot::seeded("app_installation", self.app_installation.top()),
            app_installation_client: Slot::seeded(
                "app_installation_client",
                self.app_installation_client.top(),
            ),
            is_github_action: Slot::seeded("is_github_action", self.is_github_action.top()),
            is_github_app: Slot::seeded("is_github_app", self.is_github_app.top()),
        }
    }
}

impl Default for RuntimeContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RuntimeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeContext")
            .field("config", &self.config.is_set())
            .field("github_app", &self.github_app.is_set())
            .field("github_event", &self.github_event.is_set())
            .field("app_installation", &self.app_installation.is_set())
            .field(
                "app_installation_client",
                &self.app_installation_client.is_set(),
            )
            .field("is_github_action", &self.is_github_action.is_set())
            .field("is_github_app", &self.is_github_app.is_set())
            .finish()
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
