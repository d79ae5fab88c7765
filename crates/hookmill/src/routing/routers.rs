//! Router implementations: the three handler scheduling modes.

use std::sync::Mutex;

use async_trait::async_trait;
use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::error;

use crate::error::DispatchError;
use crate::events::WebhookEvent;
use crate::routing::{first_error, EventRouter, RouteRegistry};
use crate::runtime::RuntimeContext;

/// Router awaiting handlers one after another, in registration order.
///
/// The first handler error aborts the remaining handlers.
#[derive(Default)]
pub struct SequentialRouter {
    routes: RouteRegistry,
}

impl SequentialRouter {
    /// Empty router.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventRouter for SequentialRouter {
    fn routes(&self) -> &RouteRegistry {
        &self.routes
    }

    async fn dispatch(
        &self,
        event: &WebhookEvent,
        ctx: &RuntimeContext,
    ) -> Result<(), DispatchError> {
        for handler in self.routes.emit(event.name(), event.payload()) {
            handler.handle(event, ctx).await?;
        }
        Ok(())
    }
}

/// Router running all matching handlers simultaneously.
///
/// `dispatch` returns once every handler has completed; errors are
/// collected and the first one is surfaced.
#[derive(Default)]
pub struct ConcurrentRouter {
    routes: RouteRegistry,
}

impl ConcurrentRouter {
    /// Empty router.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventRouter for ConcurrentRouter {
    fn routes(&self) -> &RouteRegistry {
        &self.routes
    }

    async fn dispatch(
        &self,
        event: &WebhookEvent,
        ctx: &RuntimeContext,
    ) -> Result<(), DispatchError> {
        let handlers = self.routes.emit(event.name(), event.payload());
        let results = join_all(
            handlers
                .iter()
                .map(|handler| handler.handle(event, ctx)),
        )
        .await;
        first_error(results)
    }
}

/// Router scheduling handlers as detached background tasks.
///
/// `dispatch` returns immediately. The router keeps a strong handle to
/// every scheduled task until it completes; losing the handles would let
/// the runtime drop unfinished handlers on shutdown without a trace.
/// Finished handles are released on the next dispatch, or through
/// [`NonBlockingConcurrentRouter::drain`].
#[derive(Default)]
pub struct NonBlockingConcurrentRouter {
    routes: RouteRegistry,
    handler_tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl NonBlockingConcurrentRouter {
    /// Empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of scheduled handler tasks not yet finished.
    pub fn pending_tasks(&self) -> usize {
        self.handler_tasks
            .lock()
            .expect("task set lock poisoned")
            .iter()
            .filter(|task| !task.is_finished())
            .count()
    }

    /// Await every scheduled handler task.
    ///
    /// Called at shutdown so in-flight handlers are not dropped mid-way.
    pub async fn drain(&self) {
        let tasks = std::mem::take(
            &mut *self
                .handler_tasks
                .lock()
                .expect("task set lock poisoned"),
        );
        for task in tasks {
            if let Err(join_error) = task.await {
                if join_error.is_cancelled() {
                    continue;
                }
                error!(error = %join_error, "Detached handler task panicked");
            }
        }
    }

    fn retain_task(&self, task: JoinHandle<()>) {
        let mut tasks = self
            .handler_tasks
            .lock()
            .expect("task set lock poisoned");
        tasks.retain(|task| !task.is_finished());
        tasks.push(task);
    }
}

#[async_trait]
impl EventRouter for NonBlockingConcurrentRouter {
    fn routes(&self) -> &RouteRegistry {
        &self.routes
    }

    async fn dispatch(
        &self,
        event: &WebhookEvent,
        ctx: &RuntimeContext,
    ) -> Result<(), DispatchError> {
        for handler in self.routes.emit(event.name(), event.payload()) {
            let event = event.clone();
            let ctx = ctx.snapshot();
            let task = tokio::spawn(async move {
                if let Err(handler_error) = handler.handle(&event, &ctx).await {
                    error!(
                        event_type = %event.name(),
                        delivery_id = %event.delivery_id(),
                        error = %handler_error,
                        "Detached handler failed"
                    );
                }
            });
            self.retain_task(task);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "routers_tests.rs"]
mod tests;
