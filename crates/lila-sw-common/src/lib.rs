//! # lila-sw common
//!
//! Error types and logging configuration shared by the background agent crates.
//!
//! ## Features
//!
//! - Unified error type with optional sources and backtraces
//! - Logging configuration and setup
//! - Option extension trait

use thiserror::Error;

pub mod logging;

pub use logging::{init_logging, LogConfig, LogFormat};

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Unified error type for the background agent.
#[derive(Error, Debug)]
pub enum SwError {
    /// Network fetch failed before a response was produced.
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// Cache storage could not be read or written.
    #[error("Cache error: {message}")]
    Cache {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// Window client enumeration, focus, navigation or opening failed.
    #[error("Clients error: {message}")]
    Clients {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// Configuration errors.
    #[error("Config error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// An event carried a payload that could not be decoded.
    #[error("Payload error: {message}")]
    Payload {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Resource not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Internal error (unexpected).
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        backtrace: Option<backtrace::Backtrace>,
    },
}

impl SwError {
    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            source: None,
        }
    }

    /// Create a network error with source.
    pub fn network_with_source<E: std::error::Error + Send + Sync + 'static>(
        message: impl Into<String>,
        source: E,
    ) -> Self {
        Self::Network {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a cache error.
    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache {
            message: message.into(),
            source: None,
        }
    }

    /// Create a clients error.
    pub fn clients(message: impl Into<String>) -> Self {
        Self::Clients {
            message: message.into(),
            source: None,
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// Create a payload error.
    pub fn payload(message: impl Into<String>) -> Self {
        Self::Payload {
            message: message.into(),
            source: None,
        }
    }

    /// Create a payload error with source.
    pub fn payload_with_source<E: std::error::Error + Send + Sync + 'static>(
        message: impl Into<String>,
        source: E,
    ) -> Self {
        Self::Payload {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an internal error with backtrace.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            backtrace: Some(backtrace::Backtrace::new()),
        }
    }

    /// Get the error category for log fields.
    pub fn category(&self) -> &'static str {
        match self {
            SwError::Network { .. } => "network",
            SwError::Cache { .. } => "cache",
            SwError::Clients { .. } => "clients",
            SwError::Config { .. } => "config",
            SwError::Payload { .. } => "payload",
            SwError::Url(_) => "url",
            SwError::NotFound(_) => "not_found",
            SwError::Internal { .. } => "internal",
        }
    }
}

/// Result type alias for background agent operations.
pub type SwResult<T> = std::result::Result<T, SwError>;

/// Extension trait for Option.
pub trait OptionExt<T> {
    /// Convert None to a NotFound error.
    fn ok_or_not_found(self, resource: impl Into<String>) -> SwResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, resource: impl Into<String>) -> SwResult<T> {
        self.ok_or_else(|| SwError::NotFound(resource.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert_eq!(SwError::network("offline").category(), "network");
        assert_eq!(SwError::cache("quota").category(), "cache");
        assert_eq!(SwError::payload("bad json").category(), "payload");
        assert_eq!(SwError::NotFound("x".into()).category(), "not_found");
        assert_eq!(SwError::clients("no window").category(), "clients");
        assert_eq!(SwError::config("duplicate key").category(), "config");
        assert_eq!(SwError::internal("join failed").category(), "internal");
    }

    #[test]
    fn test_error_source_is_kept() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err = SwError::network_with_source("fetch failed", io);
        let source = std::error::Error::source(&err).expect("source");
        assert_eq!(source.to_string(), "reset");
        assert_eq!(err.to_string(), "Network error: fetch failed");
    }

    #[test]
    fn test_url_error_converts() {
        let err: SwError = url::Url::parse("not a url").unwrap_err().into();
        assert_eq!(err.category(), "url");
    }

    #[test]
    fn test_option_ext() {
        let some: Option<i32> = Some(42);
        assert_eq!(some.ok_or_not_found("test").unwrap(), 42);

        let none: Option<i32> = None;
        assert!(matches!(
            none.ok_or_not_found("test"),
            Err(SwError::NotFound(_))
        ));
    }
}
