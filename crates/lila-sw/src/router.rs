//! Notification click routing.
//!
//! A click dismisses every displayed notification, derives one target path
//! from the clicked notification's `userData`, then does exactly one of:
//!
//! 1. focus a window already showing the target path,
//! 2. navigate a window showing the homepage to the target,
//! 3. open a new window at the target.

use std::sync::Arc;

use lila_sw_common::SwResult;
use lila_sw_core::{Notification, UserData, WorkerConfig};
use serde::Serialize;
use tracing::{debug, info};

use crate::host::{ClientId, ClientMatchOptions, ClientType, Clients, NotificationCenter};

const ROOT: &str = "/";

/// Which window action a click resulted in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum RouteOutcome {
    Focused { client_id: ClientId, target: String },
    Navigated { client_id: ClientId, target: String },
    Opened { client_id: Option<ClientId>, target: String },
}

impl RouteOutcome {
    pub fn target(&self) -> &str {
        match self {
            RouteOutcome::Focused { target, .. }
            | RouteOutcome::Navigated { target, .. }
            | RouteOutcome::Opened { target, .. } => target,
        }
    }
}

/// Target path for a notification, by fixed field priority.
pub fn target_path(user_data: &UserData) -> String {
    if let Some(full_id) = &user_data.full_id {
        format!("/{full_id}")
    } else if let Some(thread_id) = &user_data.thread_id {
        format!("/inbox/{thread_id}")
    } else if let Some(challenge_id) = &user_data.challenge_id {
        format!("/{challenge_id}")
    } else {
        ROOT.to_string()
    }
}

pub struct NotificationRouter {
    config: Arc<WorkerConfig>,
    clients: Arc<dyn Clients>,
    notifications: Arc<dyn NotificationCenter>,
}

impl NotificationRouter {
    pub fn new(
        config: Arc<WorkerConfig>,
        clients: Arc<dyn Clients>,
        notifications: Arc<dyn NotificationCenter>,
    ) -> Self {
        Self {
            config,
            clients,
            notifications,
        }
    }

    pub async fn handle_click(&self, notification: &Notification) -> SwResult<RouteOutcome> {
        let shown = self.notifications.get_all().await?;
        debug!(count = shown.len(), "Closing notifications");
        for n in shown {
            self.notifications.close(n.id).await?;
        }

        let windows = self
            .clients
            .match_all(ClientMatchOptions {
                include_uncontrolled: true,
                client_type: ClientType::Window,
            })
            .await?;

        let user_data = UserData::from_notification_data(&notification.options.data);
        let target = target_path(&user_data);

        if let Some(window) = windows
            .iter()
            .find(|w| w.focusable && w.url.path() == target)
        {
            self.clients.focus(&window.id).await?;
            info!(client_id = %window.id, target = %target, "Focused window");
            return Ok(RouteOutcome::Focused {
                client_id: window.id.clone(),
                target,
            });
        }

        let url = self.config.resolve_path(&target);

        if let Some(window) = windows
            .iter()
            .find(|w| w.navigable && w.url.path() == ROOT)
        {
            self.clients.navigate(&window.id, &url).await?;
            info!(client_id = %window.id, target = %target, "Navigated homepage window");
            return Ok(RouteOutcome::Navigated {
                client_id: window.id.clone(),
                target,
            });
        }

        let opened = self.clients.open_window(&url).await?;
        info!(target = %target, "Opened window");
        Ok(RouteOutcome::Opened {
            client_id: opened.map(|c| c.id),
            target,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Client, ClientAction, MemoryClients, MemoryNotifications};
    use lila_sw_core::{NotificationId, NotificationOptions};
    use serde_json::{json, Value};
    use url::Url;

    fn user(full: Option<&str>, thread: Option<&str>, challenge: Option<&str>) -> UserData {
        UserData {
            full_id: full.map(String::from),
            thread_id: thread.map(String::from),
            challenge_id: challenge.map(String::from),
        }
    }

    #[test]
    fn test_target_path_priority() {
        assert_eq!(target_path(&user(Some("abc"), Some("7"), Some("x"))), "/abc");
        assert_eq!(target_path(&user(None, Some("7"), Some("x"))), "/inbox/7");
        assert_eq!(target_path(&user(None, None, Some("x"))), "/x");
        assert_eq!(target_path(&UserData::default()), "/");
    }

    fn url(path: &str) -> Url {
        Url::parse("https://lichess.org/").unwrap().join(path).unwrap()
    }

    fn clicked(data: Value) -> Notification {
        Notification {
            id: NotificationId(99),
            title: "clicked".into(),
            options: NotificationOptions {
                data,
                ..Default::default()
            },
        }
    }

    async fn route(windows: Vec<Client>, data: Value) -> (RouteOutcome, Vec<ClientAction>) {
        let config = WorkerConfig::from_registration_url(&url("/sw.js?asset-url=/")).unwrap();
        let clients = Arc::new(MemoryClients::with_clients(windows));
        let router = NotificationRouter::new(
            Arc::new(config),
            clients.clone(),
            Arc::new(MemoryNotifications::new()),
        );
        let outcome = router.handle_click(&clicked(data)).await.unwrap();
        (outcome, clients.actions().await)
    }

    #[tokio::test]
    async fn test_focus_exact_match() {
        let windows = vec![
            Client::window("home", url("/")),
            Client::window("game", url("/abc?x=1#moves")),
        ];
        let (outcome, actions) = route(windows, json!({"userData": {"fullId": "abc"}})).await;

        assert_eq!(
            outcome,
            RouteOutcome::Focused {
                client_id: ClientId("game".into()),
                target: "/abc".into()
            }
        );
        assert_eq!(actions, vec![ClientAction::Focus(ClientId("game".into()))]);
    }

    #[tokio::test]
    async fn test_focus_takes_first_in_order() {
        let windows = vec![
            Client::window("a", url("/inbox/7")),
            Client::window("b", url("/inbox/7")),
        ];
        let (outcome, _) = route(windows, json!({"userData": {"threadId": "7"}})).await;
        assert_eq!(
            outcome,
            RouteOutcome::Focused {
                client_id: ClientId("a".into()),
                target: "/inbox/7".into()
            }
        );
    }

    #[tokio::test]
    async fn test_navigate_homepage_window() {
        let windows = vec![
            Client::window("tv", url("/tv")),
            Client::window("home", url("/")),
        ];
        let (outcome, actions) = route(windows, json!({"userData": {"threadId": "7"}})).await;

        assert_eq!(outcome.target(), "/inbox/7");
        assert!(matches!(outcome, RouteOutcome::Navigated { .. }));
        assert_eq!(
            actions,
            vec![ClientAction::Navigate(ClientId("home".into()), url("/inbox/7"))]
        );
    }

    #[tokio::test]
    async fn test_open_when_nothing_matches() {
        let (outcome, actions) = route(vec![], json!({"userData": {"challengeId": "x"}})).await;
        assert!(matches!(outcome, RouteOutcome::Opened { client_id: Some(_), .. }));
        assert_eq!(actions, vec![ClientAction::Open(url("/x"))]);
    }

    #[tokio::test]
    async fn test_unfocusable_window_falls_through() {
        let mut game = Client::window("game", url("/abc"));
        game.focusable = false;
        let windows = vec![game, Client::window("home", url("/"))];

        let (outcome, actions) = route(windows, json!({"userData": {"fullId": "abc"}})).await;
        assert!(matches!(outcome, RouteOutcome::Navigated { .. }));
        assert_eq!(
            actions,
            vec![ClientAction::Navigate(ClientId("home".into()), url("/abc"))]
        );
    }

    #[tokio::test]
    async fn test_unnavigable_homepage_falls_through_to_open() {
        let mut home = Client::window("home", url("/"));
        home.navigable = false;

        let (outcome, actions) = route(vec![home], json!({"userData": {"fullId": "abc"}})).await;
        assert!(matches!(outcome, RouteOutcome::Opened { .. }));
        assert_eq!(actions, vec![ClientAction::Open(url("/abc"))]);
    }

    #[tokio::test]
    async fn test_malformed_payload_routes_to_root() {
        let windows = vec![Client::window("home", url("/"))];
        let (outcome, actions) = route(windows, json!("garbage")).await;

        assert_eq!(
            outcome,
            RouteOutcome::Focused {
                client_id: ClientId("home".into()),
                target: "/".into()
            }
        );
        assert_eq!(actions.len(), 1);
    }

    #[tokio::test]
    async fn test_non_string_ids_route_like_js() {
        let (outcome, actions) = route(vec![], json!({"userData": {"threadId": 1.0}})).await;
        assert_eq!(outcome.target(), "/inbox/1");
        assert_eq!(actions, vec![ClientAction::Open(url("/inbox/1"))]);

        let (outcome, _) = route(vec![], json!({"userData": {"fullId": true}})).await;
        assert_eq!(outcome.target(), "/true");
    }

    #[tokio::test]
    async fn test_click_closes_every_notification() {
        let config = WorkerConfig::from_registration_url(&url("/sw.js?asset-url=/")).unwrap();
        let notifications = Arc::new(MemoryNotifications::new());
        for tag in ["a", "b", "c"] {
            notifications
                .show(
                    tag,
                    NotificationOptions {
                        tag: tag.into(),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
        }
        let router = NotificationRouter::new(
            Arc::new(config),
            Arc::new(MemoryClients::new()),
            notifications.clone(),
        );

        router.handle_click(&clicked(Value::Null)).await.unwrap();
        assert!(notifications.get_all().await.unwrap().is_empty());
    }

    #[test]
    fn test_outcome_serializes_with_action_tag() {
        let outcome = RouteOutcome::Opened {
            client_id: None,
            target: "/".into(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["action"], "opened");
        assert_eq!(json["target"], "/");
    }
}
