//! Capabilities the host environment provides to the agent.
//!
//! Storage, windows and notifications belong to the host. The agent only
//! opens, reads and writes named caches, enumerates and drives window
//! clients, and shows or closes notifications.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use lila_sw_common::SwResult;
use lila_sw_core::{Notification, NotificationId, NotificationOptions};
use lila_sw_net::{Network, Request, Response};
use serde::{Deserialize, Serialize};
use url::Url;

pub mod memory;

pub use memory::{ClientAction, MemoryCacheStorage, MemoryClients, MemoryNotifications, MemoryRegistration};

// ==================== Cache Storage ====================

/// Named request/response stores (`caches`).
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Look up a request across every store.
    async fn match_request(&self, request: &Request) -> SwResult<Option<Response>>;

    /// Open a store, creating it if missing.
    async fn open(&self, cache_name: &str) -> SwResult<()>;

    /// Store a response under a request in an opened store.
    async fn put(&self, cache_name: &str, request: &Request, response: Response) -> SwResult<()>;

    /// Names of all stores.
    async fn keys(&self) -> SwResult<Vec<String>>;

    /// Delete a store. Returns whether it existed.
    async fn delete(&self, cache_name: &str) -> SwResult<bool>;
}

// ==================== Clients ====================

/// Host identifier for a client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(pub String);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Client type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientType {
    #[default]
    Window,
    Worker,
    SharedWorker,
    All,
}

/// A page or worker belonging to the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub url: Url,
    pub client_type: ClientType,
    /// Host reports the client can be brought to the foreground.
    pub focusable: bool,
    /// Host reports the client can be navigated.
    pub navigable: bool,
    /// Controlled by this agent.
    pub controlled: bool,
    pub focused: bool,
}

impl Client {
    /// A window client with full capabilities.
    pub fn window(id: impl Into<String>, url: Url) -> Self {
        Self {
            id: ClientId(id.into()),
            url,
            client_type: ClientType::Window,
            focusable: true,
            navigable: true,
            controlled: false,
            focused: false,
        }
    }
}

/// Options for `Clients::match_all`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientMatchOptions {
    pub include_uncontrolled: bool,
    pub client_type: ClientType,
}

/// Clients API.
#[async_trait]
pub trait Clients: Send + Sync {
    /// Enumerate clients in host order.
    async fn match_all(&self, options: ClientMatchOptions) -> SwResult<Vec<Client>>;

    /// Bring a window to the foreground.
    async fn focus(&self, id: &ClientId) -> SwResult<Client>;

    /// Load a URL in a window. `None` when the result is not observable.
    async fn navigate(&self, id: &ClientId, url: &Url) -> SwResult<Option<Client>>;

    /// Open a new window. `None` when the result is not observable.
    async fn open_window(&self, url: &Url) -> SwResult<Option<Client>>;

    /// Take control of all uncontrolled clients in scope.
    async fn claim(&self) -> SwResult<()>;
}

// ==================== Notifications ====================

/// Notifications displayed by this application.
#[async_trait]
pub trait NotificationCenter: Send + Sync {
    /// Display a notification. A non-empty tag replaces any notification
    /// with the same tag.
    async fn show(&self, title: &str, options: NotificationOptions) -> SwResult<Notification>;

    /// Currently displayed notifications.
    async fn get_all(&self) -> SwResult<Vec<Notification>>;

    /// Dismiss a notification.
    async fn close(&self, id: NotificationId) -> SwResult<()>;
}

// ==================== Registration ====================

/// The agent's own registration.
#[async_trait]
pub trait Registration: Send + Sync {
    /// Activate as soon as installed, without waiting for old clients to close.
    async fn skip_waiting(&self) -> SwResult<()>;
}

// ==================== Host ====================

/// Every capability the host hands to the agent.
#[derive(Clone)]
pub struct Host {
    pub caches: Arc<dyn CacheStorage>,
    pub clients: Arc<dyn Clients>,
    pub notifications: Arc<dyn NotificationCenter>,
    pub registration: Arc<dyn Registration>,
    pub network: Arc<dyn Network>,
}
