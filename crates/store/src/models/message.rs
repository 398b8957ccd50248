use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub project_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub reply_to_id: Option<Uuid>,
    pub attachment_url: Option<String>,
    #[serde(default)]
    pub kind: MessageKind,
    #[serde(default)]
    pub is_edited: bool,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default)]
    pub is_starred: bool,
    /// emoji -> set of account ids that reacted with it.
    #[serde(default)]
    pub reactions: BTreeMap<String, BTreeSet<Uuid>>,
    /// Account ids that have read this message. Never contains the sender.
    #[serde(default)]
    pub read_by: BTreeSet<Uuid>,
    #[serde(default)]
    pub status: DeliveryStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    #[default]
    User,
    /// Non-user-authored entry. `content` holds a JSON [`SystemPayload`];
    /// the user-authored fields are not meaningful on these rows.
    System,
}

/// Sender-facing aggregate status. Only ever advances (sent -> delivered ->
/// read); per-viewer read state lives in `read_by`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    #[default]
    Sent,
    Delivered,
    Read,
}

/// Typed event embedded in the content column of system messages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SystemPayload {
    JoinRequested { actor: String },
    JoinApproved { actor: String },
    JoinRejected { actor: String },
    MemberRemoved { actor: String },
    MemberLeft { actor: String },
}

impl SystemPayload {
    pub fn actor(&self) -> &str {
        match self {
            Self::JoinRequested { actor }
            | Self::JoinApproved { actor }
            | Self::JoinRejected { actor }
            | Self::MemberRemoved { actor }
            | Self::MemberLeft { actor } => actor,
        }
    }
}

/// Insert shape for the messages table; id and created_at are
/// server-generated.
#[derive(Debug, Clone, Serialize)]
pub struct NewMessage {
    pub project_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub reply_to_id: Option<Uuid>,
    pub attachment_url: Option<String>,
    pub kind: MessageKind,
}

impl Message {
    pub const TABLE: &'static str = "messages";
}
