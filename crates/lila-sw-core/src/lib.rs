//! lila-sw core library
//!
//! This crate provides the immutable worker configuration, the cache rule
//! declarations and the push/notification data types.

pub mod config;
pub mod rules;
pub mod types;

pub use config::WorkerConfig;
pub use rules::{CacheRule, CacheRules, UrlMatcher};
pub use types::{Notification, NotificationId, NotificationOptions, PushMessage, UserData};
