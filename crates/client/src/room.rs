use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use chrono::Utc;
use cutroom_chat::{
    Draft, Entry, ModerationService, NotificationPolicy, Notifier, PresenceSet, PresenceSnippet,
    Timeline, TimelineChange, TypingDebouncer, TypingSet,
    membership::{EffectiveMember, MemberRoster},
    reactions,
};
use cutroom_config::Settings;
use cutroom_store::{
    ChangeEvent, Filter, Page, StoreClient, TableEvent,
    models::{Message, NewMessage, Profile, Project, ProjectMember},
};
use parking_lot::{Mutex, RwLock};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ClientError;
use crate::profiles::ProfileCache;
use crate::realtime::{RealtimeClient, RoomEvent, SubscriptionGuard, SubscriptionHandle};
use crate::session::Session;

/// A live conversation: the reconciled timeline, the member roster, and the
/// presence/typing channel for one project, kept current by a background
/// pump.
///
/// Locks here are plain `parking_lot` locks and are never held across an
/// await; anything the network needs is copied out first.
pub struct ChatRoom {
    session: Session,
    store: StoreClient,
    profiles: ProfileCache,
    moderation: ModerationService,
    timeline: RwLock<Timeline>,
    roster: RwLock<MemberRoster>,
    presence: PresenceSet,
    typing_out: Mutex<TypingDebouncer>,
    typing_in: Mutex<TypingSet>,
    notifications: Mutex<NotificationPolicy>,
    notifier: Arc<dyn Notifier>,
    focused: AtomicBool,
    handle: SubscriptionHandle,
    _guard: SubscriptionGuard,
}

impl ChatRoom {
    /// Opens the conversation: fetches the project, roster, and most recent
    /// page of history, joins the realtime topic, and starts the event pump.
    ///
    /// The pump holds only a weak reference; dropping the returned `Arc`
    /// stops it and tears the subscription down.
    pub async fn open(
        settings: &Settings,
        session: Session,
        project_id: Uuid,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Arc<Self>, ClientError> {
        if !session.is_valid() {
            return Err(ClientError::SignedOut);
        }

        let store =
            StoreClient::new(&settings.api)?.with_access_token(session.access_token());
        let profiles = ProfileCache::new(store.clone());

        let project: Project = store
            .select_one(Project::TABLE, &Filter::new().eq("id", project_id))
            .await?;
        let members: Vec<ProjectMember> = store
            .select(
                ProjectMember::TABLE,
                &Filter::new().eq("project_id", project_id),
            )
            .await?;
        let history: Vec<Message> = store
            .select(
                Message::TABLE,
                &Filter::new()
                    .eq("project_id", project_id)
                    .order("created_at", false)
                    .page(&Page {
                        page: 1,
                        per_page: settings.chat.page_size,
                    }),
            )
            .await?;

        let mut timeline = Timeline::new(
            project_id,
            session.account_id(),
            settings.chat.optimistic_match_window_secs,
        );
        timeline.seed(history);

        for id in sender_ids(&timeline, session.account_id()) {
            match profiles.get(id).await {
                Ok(profile) => attach(&mut timeline, id, &profile),
                Err(e) => warn!(%id, %e, "Sender profile unavailable"),
            }
        }

        let me = PresenceSnippet {
            account_id: session.account_id(),
            display_name: session.display_name().to_string(),
            avatar_url: session.profile().avatar_url.clone(),
        };
        let realtime = RealtimeClient::new(&settings.realtime, settings.api.anon_key.clone());
        let subscription = realtime.subscribe(&session, project_id, me).await?;
        let crate::realtime::Subscription {
            events,
            handle,
            guard,
        } = subscription;

        let room = Arc::new(Self {
            moderation: ModerationService::new(store.clone()),
            store,
            profiles,
            session,
            timeline: RwLock::new(timeline),
            roster: RwLock::new(MemberRoster::new(project, members)),
            presence: PresenceSet::new(settings.chat.presence_expiry_secs),
            typing_out: Mutex::new(TypingDebouncer::new(settings.chat.typing_debounce_ms)),
            typing_in: Mutex::new(TypingSet::new(settings.chat.typing_expiry_secs)),
            notifications: Mutex::new(NotificationPolicy::new(settings.notifications.clone())),
            notifier,
            focused: AtomicBool::new(true),
            handle,
            _guard: guard,
        });

        let weak = Arc::downgrade(&room);
        let mut events = events;
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let Some(room) = weak.upgrade() else { break };
                room.handle_event(event).await;
            }
            info!("Room event pump stopped");
        });

        Ok(room)
    }

    async fn handle_event(&self, event: RoomEvent) {
        match event {
            RoomEvent::Change(TableEvent::Message(change)) => {
                self.handle_message_change(change).await;
            }
            RoomEvent::Change(TableEvent::Member(change)) => {
                self.roster.write().apply(change);
            }
            RoomEvent::Change(TableEvent::Profile(change)) => {
                if let ChangeEvent::Insert(profile) | ChangeEvent::Update(profile) = change {
                    let info = sender_info(&profile);
                    self.profiles.insert(profile.clone());
                    let mut timeline = self.timeline.write();
                    for id in timeline.server_ids() {
                        if timeline.get(id).is_some_and(|e| e.message.sender_id == profile.id) {
                            timeline.attach_sender(id, info.clone());
                        }
                    }
                }
            }
            RoomEvent::PresenceJoined(snippet) => {
                self.presence.joined(snippet, Instant::now());
            }
            RoomEvent::PresenceLeft { account_id } => {
                self.presence.left(account_id);
                self.typing_in.lock().stopped(account_id);
            }
            RoomEvent::PresenceHeartbeat { account_id } => {
                self.presence.heartbeat(account_id, Instant::now());
            }
            RoomEvent::TypingStarted { account_id } => {
                if account_id != self.session.account_id() {
                    self.typing_in.lock().started(account_id, Instant::now());
                }
            }
            RoomEvent::TypingStopped { account_id } => {
                self.typing_in.lock().stopped(account_id);
            }
        }
    }

    async fn handle_message_change(&self, change: ChangeEvent<Message>) {
        // Fetch the sender's profile before touching the timeline lock.
        let sender = match &change {
            ChangeEvent::Insert(m) | ChangeEvent::Update(m)
                if m.sender_id != self.session.account_id() =>
            {
                self.profiles.get(m.sender_id).await.ok()
            }
            _ => None,
        };
        let sender_name = sender.as_ref().map(|p| p.display_name.clone());

        let actions = {
            let mut timeline = self.timeline.write();
            let outcome = timeline.apply(change);
            match outcome {
                Some(TimelineChange::InsertedForeign(id)) => {
                    let message = timeline.get(id).map(|e| e.message.clone());
                    if let Some(profile) = &sender {
                        timeline.attach_sender(id, sender_info(profile));
                        self.typing_in.lock().stopped(profile.id);
                    }
                    message.map(|m| {
                        self.notifications.lock().on_foreign_insert(
                            &m,
                            sender_name.as_deref(),
                            self.focused.load(Ordering::Relaxed),
                        )
                    })
                }
                Some(TimelineChange::Updated(id)) => {
                    if let Some(profile) = &sender {
                        timeline.attach_sender(id, sender_info(profile));
                    }
                    None
                }
                _ => None,
            }
        };

        for action in actions.into_iter().flatten() {
            self.notifier.notify(action).await;
        }
    }

    /// Sends a message. The timeline shows it immediately as a pending entry;
    /// on failure the entry is rolled back and the error returned.
    pub async fn send(&self, draft: Draft) -> Result<Uuid, ClientError> {
        if !self.session.is_valid() {
            return Err(ClientError::SignedOut);
        }
        if let Some(signal) = self.typing_out.lock().on_send() {
            let _ = self
                .handle
                .publish_typing(signal, self.session.account_id())
                .await;
        }

        let row = NewMessage {
            project_id: self.timeline.read().project_id(),
            sender_id: self.session.account_id(),
            content: draft.content.clone(),
            reply_to_id: draft.reply_to_id,
            attachment_url: draft.attachment_url.clone(),
            kind: Default::default(),
        };
        let local_id = self.timeline.write().push_local(draft, Utc::now());

        match self.store.insert::<_, Message>(Message::TABLE, &row).await {
            Ok(message) => {
                let id = message.id;
                self.timeline.write().apply(ChangeEvent::Insert(message));
                Ok(id)
            }
            Err(e) => {
                warn!(%e, "Send failed, rolling back placeholder");
                self.timeline.write().rollback_local(&local_id);
                Err(e.into())
            }
        }
    }

    pub async fn edit(&self, message_id: Uuid, content: &str) -> Result<(), ClientError> {
        self.patch_message(message_id, &json!({ "content": content, "is_edited": true }))
            .await
    }

    pub async fn delete_message(&self, message_id: Uuid) -> Result<(), ClientError> {
        self.store
            .delete(Message::TABLE, &Filter::new().eq("id", message_id))
            .await?;
        self.timeline
            .write()
            .apply(ChangeEvent::Delete { id: message_id });
        Ok(())
    }

    pub async fn set_pinned(&self, message_id: Uuid, pinned: bool) -> Result<(), ClientError> {
        self.patch_message(message_id, &json!({ "is_pinned": pinned }))
            .await
    }

    pub async fn set_starred(&self, message_id: Uuid, starred: bool) -> Result<(), ClientError> {
        self.patch_message(message_id, &json!({ "is_starred": starred }))
            .await
    }

    /// Toggles the viewer's reaction. Applied locally first so the UI is
    /// instant; reverted if the server refuses the write.
    pub async fn react(&self, message_id: Uuid, emoji: &str) -> Result<(), ClientError> {
        let viewer = self.session.account_id();
        let reactions = {
            let mut timeline = self.timeline.write();
            let entry = timeline
                .get_mut(message_id)
                .ok_or(ClientError::MessageNotFound)?;
            reactions::toggle(&mut entry.message, emoji, viewer);
            entry.message.reactions.clone()
        };

        let result = self
            .patch_message(message_id, &json!({ "reactions": reactions }))
            .await;
        if result.is_err() {
            let mut timeline = self.timeline.write();
            if let Some(entry) = timeline.get_mut(message_id) {
                reactions::toggle(&mut entry.message, emoji, viewer);
            }
        }
        result
    }

    /// Marks every visible foreign message as read by this viewer and pushes
    /// the updated receipts. Safe to call repeatedly.
    pub async fn mark_read(&self) -> Result<(), ClientError> {
        let viewer = self.session.account_id();
        let changed: Vec<(Uuid, Vec<Uuid>)> = {
            let mut timeline = self.timeline.write();
            timeline
                .mark_read(viewer)
                .into_iter()
                .filter_map(|id| {
                    timeline
                        .get(id)
                        .map(|e| (id, e.message.read_by.iter().copied().collect()))
                })
                .collect()
        };

        for (id, read_by) in changed {
            self.patch_message(id, &json!({ "read_by": read_by })).await?;
        }
        Ok(())
    }

    async fn patch_message(
        &self,
        message_id: Uuid,
        patch: &serde_json::Value,
    ) -> Result<(), ClientError> {
        let rows: Vec<Message> = self
            .store
            .update(Message::TABLE, &Filter::new().eq("id", message_id), patch)
            .await?;
        let mut timeline = self.timeline.write();
        for row in rows {
            timeline.apply(ChangeEvent::Update(row));
        }
        Ok(())
    }

    pub async fn approve_request(&self, request_id: Uuid) -> Result<(), ClientError> {
        let roster = self.roster.read().clone();
        let member = self
            .moderation
            .approve(
                &roster,
                self.session.account_id(),
                self.session.display_name(),
                request_id,
            )
            .await?;
        self.roster.write().apply(ChangeEvent::Update(member));
        Ok(())
    }

    pub async fn reject_request(&self, request_id: Uuid) -> Result<(), ClientError> {
        let roster = self.roster.read().clone();
        let member = self
            .moderation
            .reject(
                &roster,
                self.session.account_id(),
                self.session.display_name(),
                request_id,
            )
            .await?;
        self.roster.write().apply(ChangeEvent::Update(member));
        Ok(())
    }

    /// Call on every keystroke in the composer. Publishes a typing start the
    /// first time, then stays silent until the debounce window lapses.
    pub async fn typing_keystroke(&self) {
        let signal = self.typing_out.lock().on_keystroke(Instant::now());
        if let Some(signal) = signal {
            let _ = self
                .handle
                .publish_typing(signal, self.session.account_id())
                .await;
        }
    }

    /// Periodic tick that lets the debouncer emit the trailing stop.
    pub async fn typing_poll(&self) {
        let signal = self.typing_out.lock().poll(Instant::now());
        if let Some(signal) = signal {
            let _ = self
                .handle
                .publish_typing(signal, self.session.account_id())
                .await;
        }
    }

    pub fn set_focused(&self, focused: bool) {
        self.focused.store(focused, Ordering::Relaxed);
    }

    pub fn entries(&self) -> Vec<Entry> {
        self.timeline.read().entries().to_vec()
    }

    pub fn members(&self) -> Vec<EffectiveMember> {
        self.roster.read().effective()
    }

    pub fn pending_requests(&self) -> Vec<ProjectMember> {
        self.roster.read().pending().into_iter().cloned().collect()
    }

    pub fn can_moderate(&self) -> bool {
        self.roster.read().can_moderate(self.session.account_id())
    }

    pub fn online(&self) -> Vec<PresenceSnippet> {
        self.presence.online(Instant::now())
    }

    pub fn typing_accounts(&self) -> Vec<Uuid> {
        self.typing_in
            .lock()
            .typing_accounts(Instant::now())
            .into_iter()
            .collect()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Leaves the conversation gracefully: clears presence on the channel,
    /// then lets the subscription guard close the socket on drop.
    pub async fn leave(self: Arc<Self>) {
        let _ = self.handle.untrack_presence().await;
        self.presence.clear();
    }

    /// Ends the session everywhere this `Session` is shared. The room itself
    /// should be dropped right after; its verbs all fail once invalidated.
    pub fn sign_out(&self) {
        self.session.invalidate();
    }
}

fn sender_info(profile: &Profile) -> cutroom_chat::SenderInfo {
    cutroom_chat::SenderInfo {
        display_name: profile.display_name.clone(),
        avatar_url: profile.avatar_url.clone(),
    }
}

fn sender_ids(timeline: &Timeline, viewer_id: Uuid) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = timeline
        .entries()
        .iter()
        .map(|e| e.message.sender_id)
        .filter(|id| *id != viewer_id)
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

fn attach(timeline: &mut Timeline, sender_id: Uuid, profile: &Profile) {
    let info = sender_info(profile);
    for id in timeline.server_ids() {
        if timeline.get(id).is_some_and(|e| e.message.sender_id == sender_id) {
            timeline.attach_sender(id, info.clone());
        }
    }
}
