//! Event dispatch.
//!
//! Each event is handled on its own task, registered with the dispatcher's
//! [`KeepAlive`] so the host knows when all work has settled. Handlers share
//! no mutable state besides the worker state below.

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use lila_sw_common::{SwError, SwResult};
use lila_sw_core::{Notification, WorkerConfig};
use lila_sw_net::{Request, Response};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{info, info_span, warn, Instrument};

use crate::cache_gate::CacheGate;
use crate::host::Host;
use crate::keep_alive::KeepAlive;
use crate::lifecycle::Lifecycle;
use crate::push::PushPresenter;
use crate::router::{NotificationRouter, RouteOutcome};

// ==================== State ====================

/// Worker lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    /// Script evaluated, no lifecycle event yet.
    #[default]
    Parsed,
    /// Handling install.
    Installing,
    /// Installed, waiting for activation.
    Installed,
    /// Handling activate.
    Activating,
    /// Active and controlling clients.
    Activated,
    /// Install failed.
    Redundant,
}

// ==================== Events ====================

/// An event delivered by the host.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    Install,
    Activate,
    Fetch(Request),
    Push(Option<Bytes>),
    NotificationClick(Notification),
}

impl WorkerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            WorkerEvent::Install => "install",
            WorkerEvent::Activate => "activate",
            WorkerEvent::Fetch(_) => "fetch",
            WorkerEvent::Push(_) => "push",
            WorkerEvent::NotificationClick(_) => "notificationclick",
        }
    }
}

/// Result of a handled event.
#[derive(Debug)]
pub enum EventOutcome {
    Installed,
    /// Activation finished, with the pruned cache keys.
    Activated(Vec<String>),
    Response(Response),
    Shown(Notification),
    Routed(RouteOutcome),
}

/// Handle on an event's work. The host must not tear the agent down before
/// it settles.
#[derive(Debug)]
pub struct EventHandle<T> {
    event: &'static str,
    handle: JoinHandle<SwResult<T>>,
}

impl<T> EventHandle<T> {
    pub fn event(&self) -> &'static str {
        self.event
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the event's work to finish.
    pub async fn settled(self) -> SwResult<T> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => Err(SwError::internal(format!(
                "{} handler did not complete: {e}",
                self.event
            ))),
        }
    }
}

// ==================== Dispatcher ====================

struct Handlers {
    state: RwLock<WorkerState>,
    gate: CacheGate,
    lifecycle: Lifecycle,
    router: NotificationRouter,
    push: PushPresenter,
}

impl Handlers {
    async fn transition(&self, next: WorkerState) {
        let mut state = self.state.write().await;
        info!(from = ?*state, to = ?next, "Worker state changed");
        *state = next;
    }

    async fn install(&self) -> SwResult<()> {
        self.transition(WorkerState::Installing).await;
        match self.lifecycle.install().await {
            Ok(()) => {
                self.transition(WorkerState::Installed).await;
                Ok(())
            }
            Err(e) => {
                self.transition(WorkerState::Redundant).await;
                Err(e)
            }
        }
    }

    async fn activate(&self) -> SwResult<Vec<String>> {
        self.transition(WorkerState::Activating).await;
        let pruned = self.lifecycle.activate().await;
        self.transition(WorkerState::Activated).await;
        pruned
    }

    async fn handle(&self, event: WorkerEvent) -> SwResult<EventOutcome> {
        Ok(match event {
            WorkerEvent::Install => {
                self.install().await?;
                EventOutcome::Installed
            }
            WorkerEvent::Activate => EventOutcome::Activated(self.activate().await?),
            WorkerEvent::Fetch(request) => EventOutcome::Response(self.gate.handle_fetch(request).await?),
            WorkerEvent::Push(data) => {
                EventOutcome::Shown(self.push.handle_push(data.as_deref()).await?)
            }
            WorkerEvent::NotificationClick(notification) => {
                EventOutcome::Routed(self.router.handle_click(&notification).await?)
            }
        })
    }
}

/// Receives host events and runs their handlers.
///
/// Dispatch methods spawn onto the current tokio runtime and must be called
/// from within one.
pub struct Dispatcher {
    config: Arc<WorkerConfig>,
    handlers: Arc<Handlers>,
    keep_alive: KeepAlive,
}

impl Dispatcher {
    pub fn new(config: WorkerConfig, host: Host) -> Self {
        let config = Arc::new(config);
        let keep_alive = KeepAlive::new();

        let handlers = Handlers {
            state: RwLock::new(WorkerState::Parsed),
            gate: CacheGate::new(
                Arc::clone(&config),
                Arc::clone(&host.caches),
                Arc::clone(&host.network),
                keep_alive.clone(),
            ),
            lifecycle: Lifecycle::new(
                Arc::clone(&config),
                Arc::clone(&host.caches),
                Arc::clone(&host.clients),
                Arc::clone(&host.registration),
            ),
            router: NotificationRouter::new(
                Arc::clone(&config),
                Arc::clone(&host.clients),
                Arc::clone(&host.notifications),
            ),
            push: PushPresenter::new(Arc::clone(&config), Arc::clone(&host.notifications)),
        };

        Self {
            config,
            handlers: Arc::new(handlers),
            keep_alive,
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub async fn state(&self) -> WorkerState {
        *self.handlers.state.read().await
    }

    /// Number of events (and background cache writes) still running.
    pub fn pending(&self) -> usize {
        self.keep_alive.pending()
    }

    /// Resolve once every dispatched event and its background work is done.
    pub async fn settled(&self) {
        self.keep_alive.settled().await
    }

    pub fn install(&self) -> EventHandle<()> {
        let handlers = Arc::clone(&self.handlers);
        self.spawn("install", async move { handlers.install().await })
    }

    pub fn activate(&self) -> EventHandle<Vec<String>> {
        let handlers = Arc::clone(&self.handlers);
        self.spawn("activate", async move { handlers.activate().await })
    }

    pub fn fetch(&self, request: Request) -> EventHandle<Response> {
        let handlers = Arc::clone(&self.handlers);
        self.spawn("fetch", async move { handlers.gate.handle_fetch(request).await })
    }

    pub fn push(&self, data: Option<Bytes>) -> EventHandle<Notification> {
        let handlers = Arc::clone(&self.handlers);
        self.spawn("push", async move {
            handlers.push.handle_push(data.as_deref()).await
        })
    }

    pub fn notification_click(&self, notification: Notification) -> EventHandle<RouteOutcome> {
        let handlers = Arc::clone(&self.handlers);
        self.spawn("notificationclick", async move {
            handlers.router.handle_click(&notification).await
        })
    }

    /// Dispatch any event.
    pub fn dispatch(&self, event: WorkerEvent) -> EventHandle<EventOutcome> {
        let handlers = Arc::clone(&self.handlers);
        self.spawn(event.name(), async move { handlers.handle(event).await })
    }

    fn spawn<T, F>(&self, event: &'static str, future: F) -> EventHandle<T>
    where
        T: Send + 'static,
        F: Future<Output = SwResult<T>> + Send + 'static,
    {
        let span = info_span!("sw_event", kind = event);
        let handle = self.keep_alive.wait_until(
            async move {
                let result = future.await;
                if let Err(e) = &result {
                    warn!(category = e.category(), error = %e, "Event handler failed");
                }
                result
            }
            .instrument(span),
        );
        EventHandle { event, handle }
    }
}
