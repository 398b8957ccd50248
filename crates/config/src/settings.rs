use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub api: ApiSettings,
    pub realtime: RealtimeSettings,
    pub chat: ChatSettings,
    pub notifications: NotificationSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiSettings {
    /// Base URL of the hosted platform's REST endpoint, e.g.
    /// `https://acme.cutroom.app/rest/v1`.
    pub base_url: String,
    /// Publishable (anon) API key sent with every request. Row-level
    /// security on the platform side decides what it may touch.
    pub anon_key: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RealtimeSettings {
    /// WebSocket endpoint of the change-feed service.
    pub url: String,
    pub heartbeat_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatSettings {
    /// Keystroke bursts within this window collapse into one typing:start.
    pub typing_debounce_ms: u64,
    /// Remote typing entries expire after this long without a refresh,
    /// so a lost typing:stop cannot wedge the indicator.
    pub typing_expiry_secs: u64,
    /// Presence records expire after this long without a heartbeat, so a
    /// lost leave frame cannot pin a participant online.
    pub presence_expiry_secs: u64,
    /// An insert event replaces a local optimistic placeholder only when
    /// author and content match and the timestamps are within this window.
    pub optimistic_match_window_secs: i64,
    pub page_size: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotificationSettings {
    pub sound_enabled: bool,
    pub desktop_enabled: bool,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::default()
                    .separator("__")
                    .prefix("CUTROOM"),
            )
            .set_default("api.base_url", "http://localhost:8000/rest/v1")?
            .set_default("api.anon_key", "")?
            .set_default("api.timeout_secs", 30)?
            .set_default("realtime.url", "ws://localhost:8000/realtime/v1")?
            .set_default("realtime.heartbeat_secs", 25)?
            .set_default("chat.typing_debounce_ms", 1500)?
            .set_default("chat.typing_expiry_secs", 6)?
            .set_default("chat.presence_expiry_secs", 60)?
            .set_default("chat.optimistic_match_window_secs", 30)?
            .set_default("chat.page_size", 50)?
            .set_default("notifications.sound_enabled", true)?
            .set_default("notifications.desktop_enabled", true)?
            .build()?;

        config.try_deserialize()
    }
}
