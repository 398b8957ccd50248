//! Opens a room, prints everything the feed delivers, and marks messages
//! read as they arrive.
//!
//! Needs a running platform instance plus CUTROOM__API__* settings, a
//! CUTROOM_ACCESS_TOKEN, and a CUTROOM_PROJECT_ID in the environment.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use cutroom_client::{ChatRoom, Session};
use cutroom_config::Settings;
use cutroom_store::models::Profile;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "info,cutroom_client=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::load().context("loading settings")?;
    let token = std::env::var("CUTROOM_ACCESS_TOKEN").context("CUTROOM_ACCESS_TOKEN")?;
    let project_id = std::env::var("CUTROOM_PROJECT_ID")
        .context("CUTROOM_PROJECT_ID")?
        .parse()
        .context("CUTROOM_PROJECT_ID must be a UUID")?;
    let profile: Profile =
        serde_json::from_str(&std::env::var("CUTROOM_PROFILE").context("CUTROOM_PROFILE")?)
            .context("CUTROOM_PROFILE must be a profile row as JSON")?;

    let session = Session::new(profile, token);
    let room = ChatRoom::open(
        &settings,
        session,
        project_id,
        Arc::new(cutroom_chat::notify::TracingNotifier),
    )
    .await?;

    tracing::info!(
        members = room.members().len(),
        entries = room.entries().len(),
        "Room open"
    );

    loop {
        tokio::time::sleep(Duration::from_secs(2)).await;
        room.typing_poll().await;
        room.mark_read().await?;
        for name in room.online().iter().map(|p| p.display_name.as_str()) {
            tracing::debug!(name, "online");
        }
    }
}
