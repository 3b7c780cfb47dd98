//! Selective asset caching for intercepted requests.
//!
//! A request is answered from any cache store when present. Otherwise it is
//! fetched, and a successful response whose URL matches a cache rule is
//! stored under the first matching rule's key. Storing is best-effort and
//! runs as registered background work, so it never delays or fails the
//! response.

use std::sync::Arc;

use lila_sw_common::SwResult;
use lila_sw_core::WorkerConfig;
use lila_sw_net::{Network, Request, Response};
use tracing::{debug, trace, warn};

use crate::host::CacheStorage;
use crate::keep_alive::KeepAlive;

/// Handles fetch events.
pub struct CacheGate {
    config: Arc<WorkerConfig>,
    caches: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    keep_alive: KeepAlive,
}

impl CacheGate {
    pub fn new(
        config: Arc<WorkerConfig>,
        caches: Arc<dyn CacheStorage>,
        network: Arc<dyn Network>,
        keep_alive: KeepAlive,
    ) -> Self {
        Self {
            config,
            caches,
            network,
            keep_alive,
        }
    }

    /// Answer a request. Network errors propagate unchanged; nothing is
    /// retried.
    pub async fn handle_fetch(&self, request: Request) -> SwResult<Response> {
        match self.caches.match_request(&request).await {
            Ok(Some(hit)) => {
                debug!(url = %request.url, "Cache hit");
                return Ok(hit);
            }
            Ok(None) => trace!(url = %request.url, "Cache miss"),
            Err(e) => {
                warn!(url = %request.url, category = e.category(), error = %e, "Cache lookup failed, fetching")
            }
        }

        let response = self.network.fetch(request.clone()).await?;

        if !response.ok() {
            trace!(url = %request.url, status = %response.status, "Not caching unsuccessful response");
            return Ok(response);
        }

        if let Some(rule) = self.config.cache_rules.first_match(&request.url) {
            let caches = Arc::clone(&self.caches);
            let cache_key = rule.key.clone();
            let stored = response.clone();
            self.keep_alive
                .wait_until(async move { store(caches, cache_key, request, stored).await });
        }

        Ok(response)
    }
}

async fn store(caches: Arc<dyn CacheStorage>, cache_key: String, request: Request, response: Response) {
    let result = async {
        caches.open(&cache_key).await?;
        caches.put(&cache_key, &request, response).await
    }
    .await;

    match result {
        Ok(()) => debug!(url = %request.url, cache_key = %cache_key, "Stored response"),
        Err(e) => warn!(
            url = %request.url,
            cache_key = %cache_key,
            category = e.category(),
            error = %e,
            "Failed to store response"
        ),
    }
}
