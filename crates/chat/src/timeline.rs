use chrono::{DateTime, Duration, Utc};
use cutroom_store::ChangeEvent;
use cutroom_store::models::{DeliveryStatus, Message, MessageKind, SystemPayload};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::system::parse_system_payload;

/// Display data attached to an entry after the sender profile is known.
/// Enrichment the change feed does not carry; merges must preserve it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderInfo {
    pub display_name: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyContext {
    pub message_id: Uuid,
    pub excerpt: String,
    pub sender_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryId {
    /// Client-generated temporary identifier for an optimistic send.
    Local(String),
    Server(Uuid),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalStatus {
    Sending,
    Confirmed,
}

#[derive(Debug, Clone)]
pub struct Entry {
    pub id: EntryId,
    pub message: Message,
    pub local_status: LocalStatus,
    pub sender: Option<SenderInfo>,
    pub reply_to: Option<ReplyContext>,
    /// Parsed payload for system entries. User entries carry `None`.
    pub system: Option<SystemPayload>,
}

impl Entry {
    pub fn server_id(&self) -> Option<Uuid> {
        match self.id {
            EntryId::Server(id) => Some(id),
            EntryId::Local(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Draft {
    pub content: String,
    pub reply_to_id: Option<Uuid>,
    pub attachment_url: Option<String>,
}

/// What a single applied event did to the timeline. Drives the caller's
/// side-effects (notification fan-out, server mutations).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimelineChange {
    /// A server insert replaced an optimistic placeholder.
    ConfirmedLocal { local_id: String, id: Uuid },
    /// This viewer's own message arrived without a matching placeholder.
    InsertedOwn(Uuid),
    /// Another participant's message arrived.
    InsertedForeign(Uuid),
    InsertedSystem(Uuid),
    Updated(Uuid),
    Deleted(Uuid),
}

/// Ordered, duplicate-free message list for one conversation.
///
/// Merges optimistic local sends with the server's change feed. The feed has
/// no global ordering guarantee across tables, so everything reconciles by
/// identifier; ordering within the list is (created_at, id).
pub struct Timeline {
    project_id: Uuid,
    viewer_id: Uuid,
    match_window: Duration,
    entries: Vec<Entry>,
}

impl Timeline {
    pub fn new(project_id: Uuid, viewer_id: Uuid, match_window_secs: i64) -> Self {
        Self {
            project_id,
            viewer_id,
            match_window: Duration::seconds(match_window_secs),
            entries: Vec::new(),
        }
    }

    pub fn project_id(&self) -> Uuid {
        self.project_id
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&Entry> {
        self.entries
            .iter()
            .find(|e| e.server_id() == Some(id))
    }

    pub fn get_mut(&mut self, id: Uuid) -> Option<&mut Entry> {
        self.entries
            .iter_mut()
            .find(|e| e.server_id() == Some(id))
    }

    /// Seeds the list from a history fetch. Duplicate ids in the page are
    /// dropped; system entries with malformed payloads are omitted.
    pub fn seed(&mut self, history: Vec<Message>) {
        for message in history {
            if self.get(message.id).is_some() {
                continue;
            }
            if let Some(entry) = self.build_entry(message) {
                self.insert_sorted(entry);
            }
        }
    }

    /// Appends an optimistic placeholder for a message this client is about
    /// to send. Returns the temporary identifier used for confirmation and
    /// rollback.
    pub fn push_local(&mut self, draft: Draft, now: DateTime<Utc>) -> String {
        let local_id = nanoid::nanoid!();
        let reply_to = draft
            .reply_to_id
            .and_then(|id| self.reply_context(id));
        let message = Message {
            // Provisional row identity; replaced wholesale on confirmation.
            id: Uuid::new_v4(),
            project_id: self.project_id,
            sender_id: self.viewer_id,
            content: draft.content,
            reply_to_id: draft.reply_to_id,
            attachment_url: draft.attachment_url,
            kind: MessageKind::User,
            is_edited: false,
            is_pinned: false,
            is_starred: false,
            reactions: Default::default(),
            read_by: Default::default(),
            status: DeliveryStatus::Sent,
            created_at: now,
        };
        let entry = Entry {
            id: EntryId::Local(local_id.clone()),
            message,
            local_status: LocalStatus::Sending,
            sender: None,
            reply_to,
            system: None,
        };
        self.insert_sorted(entry);
        local_id
    }

    /// Drops a placeholder whose send failed. The view rolls back to the
    /// pre-send state; the failure is the caller's to surface.
    pub fn rollback_local(&mut self, local_id: &str) {
        self.entries
            .retain(|e| e.id != EntryId::Local(local_id.to_string()));
    }

    /// Applies one validated change event. Returns `None` when the event was
    /// absorbed without visible effect (duplicate insert, unknown delete,
    /// malformed system payload).
    pub fn apply(&mut self, event: ChangeEvent<Message>) -> Option<TimelineChange> {
        match event {
            ChangeEvent::Insert(message) => self.apply_insert(message),
            ChangeEvent::Update(message) => self.apply_update(message),
            ChangeEvent::Delete { id } => {
                let before = self.entries.len();
                self.entries.retain(|e| e.server_id() != Some(id));
                (self.entries.len() != before).then_some(TimelineChange::Deleted(id))
            }
        }
    }

    fn apply_insert(&mut self, message: Message) -> Option<TimelineChange> {
        if self.get(message.id).is_some() {
            // Already rendered (e.g. request response raced the feed echo).
            debug!(id = %message.id, "Duplicate insert absorbed");
            return None;
        }

        if message.kind == MessageKind::System {
            let entry = self.build_entry(message)?;
            let id = entry.message.id;
            self.insert_sorted(entry);
            return Some(TimelineChange::InsertedSystem(id));
        }

        if message.sender_id == self.viewer_id {
            if let Some(local_id) = self.matching_placeholder(&message) {
                let id = message.id;
                let reply_to = self
                    .entries
                    .iter()
                    .find(|e| e.id == EntryId::Local(local_id.clone()))
                    .and_then(|e| e.reply_to.clone());
                self.rollback_local(&local_id);
                self.insert_sorted(Entry {
                    id: EntryId::Server(id),
                    message,
                    local_status: LocalStatus::Confirmed,
                    sender: None,
                    reply_to,
                    system: None,
                });
                return Some(TimelineChange::ConfirmedLocal { local_id, id });
            }
            // No matching placeholder: message sent from another device or
            // before this view mounted. Plain append.
            let id = message.id;
            let entry = self.build_entry(message)?;
            self.insert_sorted(entry);
            return Some(TimelineChange::InsertedOwn(id));
        }

        let id = message.id;
        let entry = self.build_entry(message)?;
        self.insert_sorted(entry);
        Some(TimelineChange::InsertedForeign(id))
    }

    fn apply_update(&mut self, incoming: Message) -> Option<TimelineChange> {
        let id = incoming.id;
        if let Some(entry) = self.get_mut(id) {
            let previous = entry.message.clone();
            entry.message = incoming;
            // The envelope does not carry enrichment; keep what we know.
            // entry.sender / entry.reply_to survive untouched.
            // Aggregate status only ever advances.
            if previous.status > entry.message.status {
                entry.message.status = previous.status;
            }
            // Keep locally applied read receipts the event may not carry yet.
            for reader in previous.read_by {
                entry.message.read_by.insert(reader);
            }
            if entry.message.kind == MessageKind::System {
                entry.system = parse_system_payload(&entry.message.content);
            }
            let created_at_changed = previous.created_at != entry.message.created_at;
            if created_at_changed {
                self.resort();
            }
            return Some(TimelineChange::Updated(id));
        }

        // Update for a row we never rendered (missed insert); treat as insert.
        let entry = self.build_entry(incoming)?;
        self.insert_sorted(entry);
        Some(TimelineChange::Updated(id))
    }

    /// Marks every foreign, unread message as read by the viewer. Idempotent:
    /// returns only the ids whose read-by set actually changed, so callers
    /// issue server mutations for those alone. The viewer is never added to
    /// their own messages.
    pub fn mark_read(&mut self, viewer_id: Uuid) -> Vec<Uuid> {
        let mut changed = Vec::new();
        for entry in &mut self.entries {
            let Some(id) = entry.server_id() else {
                continue;
            };
            if entry.message.sender_id == viewer_id {
                continue;
            }
            if entry.message.read_by.insert(viewer_id) {
                changed.push(id);
            }
        }
        changed
    }

    /// Attaches sender display data fetched by sender identifier.
    pub fn attach_sender(&mut self, message_id: Uuid, info: SenderInfo) {
        if let Some(entry) = self.get_mut(message_id) {
            entry.sender = Some(info);
        }
    }

    /// Server ids currently rendered, in list order.
    pub fn server_ids(&self) -> Vec<Uuid> {
        self.entries.iter().filter_map(Entry::server_id).collect()
    }

    fn build_entry(&self, message: Message) -> Option<Entry> {
        let system = if message.kind == MessageKind::System {
            match parse_system_payload(&message.content) {
                Some(payload) => Some(payload),
                None => {
                    warn!(id = %message.id, "System message omitted");
                    return None;
                }
            }
        } else {
            None
        };
        let reply_to = message.reply_to_id.and_then(|id| self.reply_context(id));
        Some(Entry {
            id: EntryId::Server(message.id),
            message,
            local_status: LocalStatus::Confirmed,
            sender: None,
            reply_to,
            system,
        })
    }

    fn reply_context(&self, id: Uuid) -> Option<ReplyContext> {
        self.get(id).map(|e| ReplyContext {
            message_id: id,
            excerpt: e.message.content.chars().take(120).collect(),
            sender_name: e.sender.as_ref().map(|s| s.display_name.clone()),
        })
    }

    fn matching_placeholder(&self, message: &Message) -> Option<String> {
        self.entries.iter().find_map(|e| match &e.id {
            EntryId::Local(local_id)
                if e.message.sender_id == message.sender_id
                    && e.message.content == message.content
                    && (message.created_at - e.message.created_at).abs()
                        <= self.match_window =>
            {
                Some(local_id.clone())
            }
            _ => None,
        })
    }

    fn insert_sorted(&mut self, entry: Entry) {
        let key = sort_key(&entry);
        let pos = self
            .entries
            .partition_point(|e| sort_key(e) <= key);
        self.entries.insert(pos, entry);
    }

    fn resort(&mut self) {
        self.entries.sort_by_key(sort_key);
    }
}

fn sort_key(entry: &Entry) -> (DateTime<Utc>, Uuid) {
    (entry.message.created_at, entry.message.id)
}
