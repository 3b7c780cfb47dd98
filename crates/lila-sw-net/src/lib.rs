//! # lila-sw net
//!
//! Request and response types seen by the background agent, and the network
//! capability it fetches through.
//!
//! Bodies are reference-counted [`Bytes`], so cloning a request or response
//! yields an independent copy: the caller can consume one while the other is
//! stored.

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use url::Url;

pub mod network;

pub use network::{HttpNetwork, Network, NetworkConfig};

/// An outgoing request intercepted by the agent.
#[derive(Debug, Clone)]
pub struct Request {
    pub url: Url,
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl Request {
    /// Create a GET request.
    pub fn get(url: Url) -> Self {
        Self {
            url,
            method: Method::GET,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Create a POST request.
    pub fn post(url: Url, body: Bytes) -> Self {
        Self {
            url,
            method: Method::POST,
            headers: HeaderMap::new(),
            body: Some(body),
        }
    }

    /// Add a header.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// A response, fetched or cached.
#[derive(Debug, Clone)]
pub struct Response {
    pub url: Url,
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Whether this copy was served from cache storage.
    pub from_cache: bool,
    body: Bytes,
}

impl Response {
    pub fn new(url: Url, status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            url,
            status,
            headers: HeaderMap::new(),
            from_cache: false,
            body: body.into(),
        }
    }

    /// Add a header.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Check if the request was successful (2xx).
    pub fn ok(&self) -> bool {
        self.status.is_success()
    }

    /// Copy of this response marked as served from cache.
    pub fn cached_copy(&self) -> Self {
        Self {
            from_cache: true,
            ..self.clone()
        }
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    pub fn into_bytes(self) -> Bytes {
        self.body
    }

    /// Body as UTF-8 text, lossily decoded.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_request_builder() {
        let request = Request::get(url("https://lichess.org/")).header(
            HeaderName::from_static("accept"),
            HeaderValue::from_static("application/wasm"),
        );

        assert_eq!(request.method, Method::GET);
        assert!(request.headers.contains_key("accept"));
        assert!(request.body.is_none());
    }

    #[test]
    fn test_request_duplicate_keeps_body() {
        let request = Request::post(url("https://lichess.org/api"), Bytes::from_static(b"x=1"));
        let copy = request.clone();
        assert_eq!(copy.url, request.url);
        assert_eq!(copy.body, request.body);
    }

    #[test]
    fn test_response_ok() {
        let u = url("https://lichess.org/");
        assert!(Response::new(u.clone(), StatusCode::OK, "").ok());
        assert!(Response::new(u.clone(), StatusCode::NO_CONTENT, "").ok());
        assert!(!Response::new(u.clone(), StatusCode::NOT_MODIFIED, "").ok());
        assert!(!Response::new(u, StatusCode::NOT_FOUND, "").ok());
    }

    #[test]
    fn test_response_copies_are_independent() {
        let response = Response::new(url("https://lichess.org/a"), StatusCode::OK, "engine");
        let stored = response.clone();
        assert_eq!(response.into_bytes(), Bytes::from_static(b"engine"));
        assert_eq!(stored.text(), "engine");
    }

    #[test]
    fn test_cached_copy() {
        let response = Response::new(url("https://lichess.org/a"), StatusCode::OK, "x");
        let cached = response.cached_copy();
        assert!(cached.from_cache);
        assert!(!response.from_cache);
        assert_eq!(cached.body_len(), 1);
    }
}
