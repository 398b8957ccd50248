use cutroom_chat::{PresenceSnippet, TypingSignal};
use cutroom_config::settings::RealtimeSettings;
use cutroom_store::{RawEnvelope, TableEvent};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::session::Session;

const RECONNECT_DELAY: Duration = Duration::from_secs(3);
const ACK_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum RealtimeError {
    #[error("WebSocket error: {0}")]
    Ws(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("Subscription closed")]
    Closed,
}

/// One validated occurrence on a conversation's channel.
#[derive(Debug, Clone)]
pub enum RoomEvent {
    Change(TableEvent),
    PresenceJoined(PresenceSnippet),
    PresenceLeft { account_id: Uuid },
    /// Relayed keepalive from another participant; refreshes their
    /// presence record's expiry.
    PresenceHeartbeat { account_id: Uuid },
    TypingStarted { account_id: Uuid },
    TypingStopped { account_id: Uuid },
}

/// Raw channel frame. Everything leaves this shape before it reaches the
/// view-model.
#[derive(Debug, Deserialize)]
struct Frame {
    #[serde(default)]
    #[allow(dead_code)]
    topic: Option<String>,
    event: String,
    #[serde(default)]
    payload: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct AccountRef {
    account_id: Uuid,
}

fn parse_frame(text: &str) -> Option<RoomEvent> {
    let frame: Frame = match serde_json::from_str(text) {
        Ok(f) => f,
        Err(e) => {
            warn!(%e, "Unparseable realtime frame, skipping");
            return None;
        }
    };

    match frame.event.as_str() {
        "change" => {
            let raw: RawEnvelope = match serde_json::from_value(frame.payload) {
                Ok(r) => r,
                Err(e) => {
                    warn!(%e, "Malformed change envelope, skipping");
                    return None;
                }
            };
            match TableEvent::decode(&raw) {
                Ok(event) => Some(RoomEvent::Change(event)),
                Err(e) => {
                    warn!(%e, "Undecodable change event, skipping");
                    None
                }
            }
        }
        "presence:join" => match serde_json::from_value(frame.payload) {
            Ok(snippet) => Some(RoomEvent::PresenceJoined(snippet)),
            Err(e) => {
                warn!(%e, "Malformed presence payload, skipping");
                None
            }
        },
        "presence:leave" => serde_json::from_value::<AccountRef>(frame.payload)
            .ok()
            .map(|a| RoomEvent::PresenceLeft {
                account_id: a.account_id,
            }),
        "presence:heartbeat" => serde_json::from_value::<AccountRef>(frame.payload)
            .ok()
            .map(|a| RoomEvent::PresenceHeartbeat {
                account_id: a.account_id,
            }),
        "typing:start" => serde_json::from_value::<AccountRef>(frame.payload)
            .ok()
            .map(|a| RoomEvent::TypingStarted {
                account_id: a.account_id,
            }),
        "typing:stop" => serde_json::from_value::<AccountRef>(frame.payload)
            .ok()
            .map(|a| RoomEvent::TypingStopped {
                account_id: a.account_id,
            }),
        "heartbeat_ack" => None,
        other => {
            debug!(other, "Unknown realtime event, skipping");
            None
        }
    }
}

/// Frames that (re)establish the channel state: table subscriptions, then
/// the presence announcement. Sent on every connect, so a reconnect
/// re-announces automatically. The profiles table has no project column and
/// is subscribed unfiltered; profile events only refresh display data.
fn join_frames(topic: &str, project_id: Uuid, presence: &PresenceSnippet) -> Vec<String> {
    let mut frames: Vec<String> = ["messages", "project_members"]
        .into_iter()
        .map(|table| {
            json!({
                "action": "subscribe",
                "topic": topic,
                "table": table,
                "filter": format!("project_id=eq.{project_id}"),
            })
            .to_string()
        })
        .collect();
    frames.push(
        json!({
            "action": "subscribe",
            "topic": topic,
            "table": "profiles",
        })
        .to_string(),
    );
    frames.push(
        json!({
            "action": "presence_track",
            "topic": topic,
            "payload": presence,
        })
        .to_string(),
    );
    frames
}

/// Outbound frame plus an optional write acknowledgment, completed by the
/// driver once the text has actually reached the socket.
struct OutboundFrame {
    text: String,
    ack: Option<oneshot::Sender<()>>,
}

/// Sends frames into a live subscription. Cheap to clone.
#[derive(Clone)]
pub struct SubscriptionHandle {
    topic: String,
    outbound: mpsc::Sender<OutboundFrame>,
}

impl SubscriptionHandle {
    async fn send_raw(&self, frame: serde_json::Value) -> Result<(), RealtimeError> {
        self.outbound
            .send(OutboundFrame {
                text: frame.to_string(),
                ack: None,
            })
            .await
            .map_err(|_| RealtimeError::Closed)
    }

    pub async fn publish_typing(
        &self,
        signal: TypingSignal,
        account_id: Uuid,
    ) -> Result<(), RealtimeError> {
        let event = match signal {
            TypingSignal::Start => "typing:start",
            TypingSignal::Stop => "typing:stop",
        };
        self.send_raw(json!({
            "action": "broadcast",
            "topic": self.topic,
            "event": event,
            "payload": { "account_id": account_id },
        }))
        .await
    }

    /// Clears the local participant's presence and waits until the frame is
    /// on the wire, so teardown right after cannot drop it unsent. The wait
    /// is bounded: a socket mid-reconnect gives up after [`ACK_TIMEOUT`].
    pub async fn untrack_presence(&self) -> Result<(), RealtimeError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.outbound
            .send(OutboundFrame {
                text: json!({
                    "action": "presence_untrack",
                    "topic": self.topic,
                })
                .to_string(),
                ack: Some(ack_tx),
            })
            .await
            .map_err(|_| RealtimeError::Closed)?;
        if tokio::time::timeout(ACK_TIMEOUT, ack_rx).await.is_err() {
            debug!("Presence untrack not confirmed before timeout");
        }
        Ok(())
    }
}

/// Aborts the socket driver when the owning room goes away, tearing the
/// subscription down with it.
pub struct SubscriptionGuard {
    driver: JoinHandle<()>,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

pub struct Subscription {
    pub events: mpsc::Receiver<RoomEvent>,
    pub handle: SubscriptionHandle,
    pub guard: SubscriptionGuard,
}

impl Subscription {
    pub async fn recv(&mut self) -> Option<RoomEvent> {
        self.events.recv().await
    }

    /// Graceful leave: clears the local participant's presence before the
    /// guard tears the socket down.
    pub async fn leave(self) {
        let _ = self.handle.untrack_presence().await;
    }
}

/// Client for the platform's change-feed/presence service. One subscription
/// per conversation.
pub struct RealtimeClient {
    url: String,
    anon_key: String,
    heartbeat: Duration,
}

impl RealtimeClient {
    pub fn new(settings: &RealtimeSettings, anon_key: impl Into<String>) -> Self {
        Self {
            url: settings.url.trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            heartbeat: Duration::from_secs(settings.heartbeat_secs),
        }
    }

    /// Joins the conversation's topic: subscribes to the message and
    /// membership change feeds filtered by project, announces the local
    /// participant's presence, and keeps the channel alive with heartbeats.
    /// Dropped connections reconnect and re-announce on their own; the
    /// driver stops for good when the session is invalidated or the
    /// subscription is dropped.
    pub async fn subscribe(
        &self,
        session: &Session,
        project_id: Uuid,
        presence: PresenceSnippet,
    ) -> Result<Subscription, RealtimeError> {
        let url = format!(
            "{}?apikey={}&token={}",
            self.url,
            urlencoding::encode(&self.anon_key),
            urlencoding::encode(session.access_token()),
        );

        // First connect happens inline so auth/endpoint errors surface to
        // the caller instead of a silent retry loop.
        let (stream, _) = connect_async(url.as_str()).await?;
        info!(%project_id, "Realtime channel connected");

        let topic = format!("project:{project_id}");
        let (out_tx, out_rx) = mpsc::channel::<OutboundFrame>(64);
        let (event_tx, event_rx) = mpsc::channel::<RoomEvent>(256);

        let handle = SubscriptionHandle {
            topic: topic.clone(),
            outbound: out_tx,
        };

        let driver = tokio::spawn(drive(
            stream,
            url,
            topic,
            project_id,
            presence,
            session.clone(),
            self.heartbeat,
            out_rx,
            event_tx,
        ));

        Ok(Subscription {
            events: event_rx,
            handle,
            guard: SubscriptionGuard { driver },
        })
    }
}

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Owns the socket for the subscription's lifetime: pumps outbound frames,
/// parses inbound ones, ticks the heartbeat, and reconnects on failure.
#[allow(clippy::too_many_arguments)]
async fn drive(
    stream: WsStream,
    url: String,
    topic: String,
    project_id: Uuid,
    presence: PresenceSnippet,
    session: Session,
    heartbeat: Duration,
    mut out_rx: mpsc::Receiver<OutboundFrame>,
    event_tx: mpsc::Sender<RoomEvent>,
) {
    let mut current = Some(stream);
    loop {
        if !session.is_valid() {
            info!("Session invalidated, stopping realtime driver");
            return;
        }

        let ws = match current.take() {
            Some(ws) => ws,
            None => match connect_async(url.as_str()).await {
                Ok((ws, _)) => {
                    info!(%project_id, "Realtime channel reconnected");
                    ws
                }
                Err(e) => {
                    warn!(%e, "Realtime reconnect failed");
                    tokio::time::sleep(RECONNECT_DELAY).await;
                    continue;
                }
            },
        };
        let (mut sink, mut source) = ws.split();

        let mut joined = true;
        for frame in join_frames(&topic, project_id, &presence) {
            if let Err(e) = sink.send(WsMessage::Text(frame.into())).await {
                warn!(%e, "Channel join failed");
                joined = false;
                break;
            }
        }
        if !joined {
            tokio::time::sleep(RECONNECT_DELAY).await;
            continue;
        }

        let mut ticker = tokio::time::interval(heartbeat);
        ticker.tick().await; // first tick is immediate

        loop {
            tokio::select! {
                maybe = out_rx.recv() => match maybe {
                    Some(frame) => {
                        match sink.send(WsMessage::Text(frame.text.into())).await {
                            Ok(()) => {
                                if let Some(ack) = frame.ack {
                                    let _ = ack.send(());
                                }
                            }
                            // Dropping frame.ack wakes the waiter early.
                            Err(e) => {
                                warn!(%e, "Realtime write failed");
                                break;
                            }
                        }
                    }
                    // Every handle dropped: the subscription is over.
                    None => {
                        let _ = sink.send(WsMessage::Close(None)).await;
                        return;
                    }
                },
                message = source.next() => match message {
                    Some(Ok(WsMessage::Text(text))) => {
                        if let Some(event) = parse_frame(text.as_str()) {
                            if event_tx.send(event).await.is_err() {
                                return;
                            }
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) | None => {
                        debug!("Realtime channel closed by server");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(%e, "Realtime read failed");
                        break;
                    }
                },
                _ = ticker.tick() => {
                    let frame = json!({ "action": "heartbeat" }).to_string();
                    if sink.send(WsMessage::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
            }
        }

        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}
