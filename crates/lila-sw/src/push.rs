//! Push messages become persistent notifications.

use std::sync::Arc;

use lila_sw_common::{SwError, SwResult};
use lila_sw_core::{Notification, NotificationOptions, PushMessage, WorkerConfig};
use tracing::debug;

use crate::host::NotificationCenter;

pub struct PushPresenter {
    config: Arc<WorkerConfig>,
    notifications: Arc<dyn NotificationCenter>,
}

impl PushPresenter {
    pub fn new(config: Arc<WorkerConfig>, notifications: Arc<dyn NotificationCenter>) -> Self {
        Self {
            config,
            notifications,
        }
    }

    /// Decode a push body and display it.
    pub async fn handle_push(&self, data: Option<&[u8]>) -> SwResult<Notification> {
        let data = data.ok_or_else(|| SwError::payload("push event carried no data"))?;
        let message = PushMessage::from_slice(data)?;

        let options = NotificationOptions {
            badge: self.config.badge_url(),
            icon: self.config.icon_url(),
            body: message.body,
            tag: message.tag,
            data: message.payload,
            require_interaction: true,
        };

        let notification = self.notifications.show(&message.title, options).await?;
        debug!(id = notification.id.0, tag = %notification.options.tag, "Notification shown");
        Ok(notification)
    }
}
