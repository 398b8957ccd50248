use async_trait::async_trait;
use cutroom_config::settings::NotificationSettings;
use cutroom_store::models::Message;
use std::collections::HashSet;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationAction {
    Sound,
    /// In-app toast shown when the viewer is elsewhere in the app.
    Toast { title: String, body: String },
    /// OS-level notification for an unfocused window.
    Desktop { title: String, body: String },
}

/// Decides the side-effects for a foreign insert: sound always, toast and
/// OS notification only when the viewer is not focused on the conversation.
/// Exactly once per message — replays and feed echoes produce nothing.
pub struct NotificationPolicy {
    settings: NotificationSettings,
    notified: HashSet<Uuid>,
}

impl NotificationPolicy {
    pub fn new(settings: NotificationSettings) -> Self {
        Self {
            settings,
            notified: HashSet::new(),
        }
    }

    pub fn on_foreign_insert(
        &mut self,
        message: &Message,
        sender_name: Option<&str>,
        focused: bool,
    ) -> Vec<NotificationAction> {
        if !self.notified.insert(message.id) {
            return Vec::new();
        }

        let mut actions = Vec::new();
        if self.settings.sound_enabled {
            actions.push(NotificationAction::Sound);
        }
        if !focused {
            let title = sender_name.unwrap_or("New message").to_string();
            let body: String = message.content.chars().take(140).collect();
            actions.push(NotificationAction::Toast {
                title: title.clone(),
                body: body.clone(),
            });
            if self.settings.desktop_enabled {
                actions.push(NotificationAction::Desktop { title, body });
            }
        }
        actions
    }
}

/// Delivery seam for notification side-effects. Embedders plug in their
/// sound/toast/OS backends; the default just logs.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, action: NotificationAction);
}

pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, action: NotificationAction) {
        info!(?action, "notification");
    }
}
