//! Network access.
//!
//! The agent performs no retries and sets no timeouts of its own; both are
//! left to the host network layer.

use async_trait::async_trait;
use lila_sw_common::{SwError, SwResult};
use reqwest::Client;
use tracing::{debug, info, trace};

use crate::{Request, Response};

/// Capability to fetch a request from the network.
#[async_trait]
pub trait Network: Send + Sync {
    /// Fetch a request. Errors only when no response was produced;
    /// non-2xx statuses are returned as responses.
    async fn fetch(&self, request: Request) -> SwResult<Response>;
}

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// User agent string.
    pub user_agent: String,
    /// Maximum redirects.
    pub max_redirects: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("lila-sw/{}", env!("CARGO_PKG_VERSION")),
            max_redirects: 10,
        }
    }
}

/// Network backed by a reqwest client.
pub struct HttpNetwork {
    client: Client,
}

impl HttpNetwork {
    /// Create a new HTTP network.
    pub fn new(config: NetworkConfig) -> SwResult<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(|e| SwError::network_with_source("failed to build HTTP client", e))?;

        info!(user_agent = %config.user_agent, "HttpNetwork initialized");

        Ok(Self { client })
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: Request) -> SwResult<Response> {
        debug!(url = %request.url, method = %request.method, "Fetching from network");

        let mut req_builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());

        if let Some(body) = request.body {
            req_builder = req_builder.body(body);
        }

        let response = req_builder
            .send()
            .await
            .map_err(|e| SwError::network_with_source(format!("fetch {} failed", request.url), e))?;

        let status = response.status();
        let headers = response.headers().clone();
        let url = response.url().clone();

        let body = response
            .bytes()
            .await
            .map_err(|e| SwError::network_with_source(format!("reading {url} failed"), e))?;

        trace!(url = %url, status = %status, body_len = body.len(), "Response received");

        let mut fetched = Response::new(url, status, body);
        fetched.headers = headers;
        Ok(fetched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use url::Url;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_network_config_default() {
        let config = NetworkConfig::default();
        assert!(config.user_agent.starts_with("lila-sw/"));
        assert_eq!(config.max_redirects, 10);
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/assets/engine.wasm"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/wasm")
                    .set_body_bytes(b"\0asm".to_vec()),
            )
            .mount(&server)
            .await;

        let network = HttpNetwork::new(NetworkConfig::default()).unwrap();
        let url = Url::parse(&format!("{}/assets/engine.wasm", server.uri())).unwrap();
        let response = network.fetch(Request::get(url)).await.unwrap();

        assert!(response.ok());
        assert!(!response.from_cache);
        assert_eq!(response.body().as_ref(), b"\0asm");
        assert_eq!(response.headers["content-type"], "application/wasm");
    }

    #[tokio::test]
    async fn test_fetch_non_success_is_a_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let network = HttpNetwork::new(NetworkConfig::default()).unwrap();
        let url = Url::parse(&format!("{}/missing", server.uri())).unwrap();
        let response = network.fetch(Request::get(url)).await.unwrap();

        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert!(!response.ok());
    }

    #[tokio::test]
    async fn test_fetch_connection_failure_is_an_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let url = Url::parse(&format!("http://{addr}/gone")).unwrap();

        let network = HttpNetwork::new(NetworkConfig::default()).unwrap();
        let err = network.fetch(Request::get(url)).await.unwrap_err();
        assert_eq!(err.category(), "network");
    }
}
