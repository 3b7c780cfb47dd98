//! Install and activate handling.
//!
//! Activation prunes every cache store whose key is no longer declared, so
//! versioned keys left behind by previous deployments are reclaimed, and
//! opens the declared ones. Afterwards the stored keys are exactly the
//! declared keys.

use std::sync::Arc;

use lila_sw_common::SwResult;
use lila_sw_core::WorkerConfig;
use tracing::{debug, info};

use crate::host::{CacheStorage, Clients, Registration};

pub struct Lifecycle {
    config: Arc<WorkerConfig>,
    caches: Arc<dyn CacheStorage>,
    clients: Arc<dyn Clients>,
    registration: Arc<dyn Registration>,
}

impl Lifecycle {
    pub fn new(
        config: Arc<WorkerConfig>,
        caches: Arc<dyn CacheStorage>,
        clients: Arc<dyn Clients>,
        registration: Arc<dyn Registration>,
    ) -> Self {
        Self {
            config,
            caches,
            clients,
            registration,
        }
    }

    /// Become active without waiting for existing clients to close.
    pub async fn install(&self) -> SwResult<()> {
        self.registration.skip_waiting().await
    }

    /// Delete undeclared cache stores, open declared ones, then claim open
    /// clients.
    ///
    /// Returns the deleted keys.
    pub async fn activate(&self) -> SwResult<Vec<String>> {
        let mut pruned = Vec::new();
        for key in self.caches.keys().await? {
            if self.config.cache_rules.contains_key(&key) {
                continue;
            }
            if self.caches.delete(&key).await? {
                info!(cache_key = %key, "Deleted stale cache");
                pruned.push(key);
            }
        }

        for key in self.config.cache_rules.keys() {
            self.caches.open(key).await?;
        }

        self.clients.claim().await?;
        debug!(pruned = pruned.len(), "Claimed clients");
        Ok(pruned)
    }
}
