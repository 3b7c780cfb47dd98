//! In-memory host capabilities.
//!
//! Used by the smoke harness and tests. Actions on clients are recorded so
//! callers can observe exactly what the agent asked the host to do.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use hashbrown::HashMap;
use http::Method;
use lila_sw_common::{OptionExt, SwError, SwResult};
use lila_sw_core::{Notification, NotificationId, NotificationOptions};
use lila_sw_net::{Request, Response};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, trace};
use url::Url;

use super::{
    CacheStorage, Client, ClientId, ClientMatchOptions, ClientType, Clients, NotificationCenter,
    Registration,
};

// ==================== Cache ====================

/// Entry key: the request URL without its fragment.
fn entry_key(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.into()
}

/// A named store.
#[derive(Debug)]
struct Cache {
    name: String,
    entries: HashMap<String, Response>,
}

impl Cache {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: HashMap::new(),
        }
    }

    fn size(&self) -> usize {
        self.entries.values().map(Response::body_len).sum()
    }
}

/// Cache storage kept in memory. Stores enumerate in creation order.
#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    caches: RwLock<Vec<Cache>>,
    quota: Option<usize>,
    unavailable: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit the total stored body bytes.
    pub fn with_quota(quota: usize) -> Self {
        Self {
            quota: Some(quota),
            ..Self::default()
        }
    }

    /// Make every operation fail, as when storage is unavailable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of successful writes.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of entries in a store, if it exists.
    pub async fn entry_count(&self, cache_name: &str) -> Option<usize> {
        let caches = self.caches.read().await;
        caches
            .iter()
            .find(|c| c.name == cache_name)
            .map(|c| c.entries.len())
    }

    fn check_available(&self) -> SwResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(SwError::cache("storage unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn match_request(&self, request: &Request) -> SwResult<Option<Response>> {
        self.check_available()?;
        if request.method != Method::GET {
            return Ok(None);
        }

        let key = entry_key(&request.url);
        let caches = self.caches.read().await;
        for cache in caches.iter() {
            if let Some(response) = cache.entries.get(&key) {
                trace!(url = %request.url, cache_key = %cache.name, "Cache entry found");
                return Ok(Some(response.cached_copy()));
            }
        }
        Ok(None)
    }

    async fn open(&self, cache_name: &str) -> SwResult<()> {
        self.check_available()?;
        let mut caches = self.caches.write().await;
        if !caches.iter().any(|c| c.name == cache_name) {
            debug!(cache_key = %cache_name, "Creating cache");
            caches.push(Cache::new(cache_name));
        }
        Ok(())
    }

    async fn put(&self, cache_name: &str, request: &Request, response: Response) -> SwResult<()> {
        self.check_available()?;
        if request.method != Method::GET {
            return Err(SwError::cache(format!(
                "cannot store a {} request",
                request.method
            )));
        }

        let mut caches = self.caches.write().await;

        if let Some(quota) = self.quota {
            let used: usize = caches.iter().map(Cache::size).sum();
            if used + response.body_len() > quota {
                return Err(SwError::cache(format!(
                    "quota exceeded: {} + {} > {} bytes",
                    used,
                    response.body_len(),
                    quota
                )));
            }
        }

        let cache = caches
            .iter_mut()
            .find(|c| c.name == cache_name)
            .ok_or_not_found(format!("cache {cache_name}"))?;
        cache.entries.insert(entry_key(&request.url), response);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn keys(&self) -> SwResult<Vec<String>> {
        self.check_available()?;
        let caches = self.caches.read().await;
        Ok(caches.iter().map(|c| c.name.clone()).collect())
    }

    async fn delete(&self, cache_name: &str) -> SwResult<bool> {
        self.check_available()?;
        let mut caches = self.caches.write().await;
        let before = caches.len();
        caches.retain(|c| c.name != cache_name);
        Ok(caches.len() != before)
    }
}

// ==================== Clients ====================

/// An action the agent asked the host to perform on clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientAction {
    Focus(ClientId),
    Navigate(ClientId, Url),
    Open(Url),
    Claim,
}

/// Clients kept in memory, in insertion order.
#[derive(Debug, Default)]
pub struct MemoryClients {
    clients: RwLock<Vec<Client>>,
    actions: RwLock<Vec<ClientAction>>,
    next_id: AtomicU64,
}

impl MemoryClients {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with existing clients.
    pub fn with_clients(clients: Vec<Client>) -> Self {
        Self {
            clients: RwLock::new(clients),
            ..Self::default()
        }
    }

    /// Add a client.
    pub async fn add(&self, client: Client) {
        self.clients.write().await.push(client);
    }

    /// Get a client by ID.
    pub async fn get(&self, id: &ClientId) -> Option<Client> {
        self.clients.read().await.iter().find(|c| &c.id == id).cloned()
    }

    /// Actions performed so far.
    pub async fn actions(&self) -> Vec<ClientAction> {
        self.actions.read().await.clone()
    }

    async fn record(&self, action: ClientAction) {
        self.actions.write().await.push(action);
    }
}

#[async_trait]
impl Clients for MemoryClients {
    async fn match_all(&self, options: ClientMatchOptions) -> SwResult<Vec<Client>> {
        let clients = self.clients.read().await;
        Ok(clients
            .iter()
            .filter(|c| options.include_uncontrolled || c.controlled)
            .filter(|c| match options.client_type {
                ClientType::All => true,
                t => c.client_type == t,
            })
            .cloned()
            .collect())
    }

    async fn focus(&self, id: &ClientId) -> SwResult<Client> {
        let focused = {
            let mut clients = self.clients.write().await;
            let client = clients
                .iter_mut()
                .find(|c| &c.id == id)
                .ok_or_not_found(format!("client {id}"))?;
            if client.client_type != ClientType::Window || !client.focusable {
                return Err(SwError::clients(format!("client {id} cannot be focused")));
            }
            client.focused = true;
            client.clone()
        };
        self.record(ClientAction::Focus(id.clone())).await;
        Ok(focused)
    }

    async fn navigate(&self, id: &ClientId, url: &Url) -> SwResult<Option<Client>> {
        let navigated = {
            let mut clients = self.clients.write().await;
            let client = clients
                .iter_mut()
                .find(|c| &c.id == id)
                .ok_or_not_found(format!("client {id}"))?;
            if client.client_type != ClientType::Window || !client.navigable {
                return Err(SwError::clients(format!("client {id} cannot be navigated")));
            }
            client.url = url.clone();
            client.clone()
        };
        self.record(ClientAction::Navigate(id.clone(), url.clone())).await;
        Ok(Some(navigated))
    }

    async fn open_window(&self, url: &Url) -> SwResult<Option<Client>> {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let mut client = Client::window(format!("opened-{n}"), url.clone());
        client.focused = true;
        client.controlled = true;

        self.clients.write().await.push(client.clone());
        self.record(ClientAction::Open(url.clone())).await;
        Ok(Some(client))
    }

    async fn claim(&self) -> SwResult<()> {
        {
            let mut clients = self.clients.write().await;
            for client in clients.iter_mut() {
                client.controlled = true;
            }
        }
        self.record(ClientAction::Claim).await;
        Ok(())
    }
}

// ==================== Notifications ====================

/// Notifications kept in memory.
#[derive(Debug, Default)]
pub struct MemoryNotifications {
    shown: RwLock<Vec<Notification>>,
    next_id: AtomicU64,
}

impl MemoryNotifications {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationCenter for MemoryNotifications {
    async fn show(&self, title: &str, options: NotificationOptions) -> SwResult<Notification> {
        let notification = Notification {
            id: NotificationId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1),
            title: title.to_string(),
            options,
        };

        let mut shown = self.shown.write().await;
        let tag = &notification.options.tag;
        if !tag.is_empty() {
            shown.retain(|n| &n.options.tag != tag);
        }
        shown.push(notification.clone());
        Ok(notification)
    }

    async fn get_all(&self) -> SwResult<Vec<Notification>> {
        Ok(self.shown.read().await.clone())
    }

    async fn close(&self, id: NotificationId) -> SwResult<()> {
        self.shown.write().await.retain(|n| n.id != id);
        Ok(())
    }
}

// ==================== Registration ====================

/// Registration kept in memory.
#[derive(Debug, Default)]
pub struct MemoryRegistration {
    skipped_waiting: AtomicBool,
}

impl MemoryRegistration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skipped_waiting(&self) -> bool {
        self.skipped_waiting.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Registration for MemoryRegistration {
    async fn skip_waiting(&self) -> SwResult<()> {
        self.skipped_waiting.store(true, Ordering::SeqCst);
        Ok(())
    }
}
