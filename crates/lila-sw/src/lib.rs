//! # lila-sw
//!
//! Background agent for the lila web application.
//!
//! ## Features
//!
//! - **Asset cache gate**: serves whitelisted large assets from versioned
//!   cache stores, fetching and storing them on a miss
//! - **Lifecycle**: immediate activation, pruning of undeclared cache stores
//! - **Push**: push messages become persistent notifications
//! - **Notification routing**: a click focuses, navigates or opens a window
//!
//! ## Architecture
//!
//! ```text
//! Host events ──→ Dispatcher ──┬── install / activate ──→ Lifecycle
//!                    │         ├── fetch ───────────────→ CacheGate
//!                    │         ├── push ────────────────→ PushPresenter
//!                    │         └── notificationclick ───→ NotificationRouter
//!                    │
//!                    └── KeepAlive (waitUntil registry)
//!
//! Host capabilities: CacheStorage, Clients, NotificationCenter,
//!                    Registration, Network
//! ```

pub mod cache_gate;
pub mod dispatcher;
pub mod host;
pub mod keep_alive;
pub mod lifecycle;
pub mod push;
pub mod router;

pub use cache_gate::CacheGate;
pub use dispatcher::{Dispatcher, EventHandle, EventOutcome, WorkerEvent, WorkerState};
pub use host::{
    CacheStorage, Client, ClientId, ClientMatchOptions, ClientType, Clients, Host,
    NotificationCenter, Registration,
};
pub use keep_alive::KeepAlive;
pub use lifecycle::Lifecycle;
pub use push::PushPresenter;
pub use router::{target_path, NotificationRouter, RouteOutcome};

pub use lila_sw_common::{SwError, SwResult};
pub use lila_sw_core::{
    CacheRule, CacheRules, Notification, NotificationId, NotificationOptions, PushMessage,
    UrlMatcher, UserData, WorkerConfig,
};
pub use lila_sw_net::{Network, Request, Response};
