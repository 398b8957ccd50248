use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::EventError;
use crate::models::{Message, Profile, ProjectMember};

/// Change-feed envelope exactly as the platform emits it. Stringly typed;
/// nothing downstream of [`TableEvent::decode`] ever sees one.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEnvelope {
    #[serde(rename = "eventType")]
    pub event_type: String,
    pub table: String,
    #[serde(default)]
    pub new: Option<Value>,
    #[serde(default)]
    pub old: Option<Value>,
}

#[derive(Debug, Clone)]
pub enum ChangeEvent<T> {
    Insert(T),
    Update(T),
    /// Delete envelopes carry only the old row's identity.
    Delete { id: Uuid },
}

/// A validated change event, tagged by source table.
#[derive(Debug, Clone)]
pub enum TableEvent {
    Message(ChangeEvent<Message>),
    Member(ChangeEvent<ProjectMember>),
    Profile(ChangeEvent<Profile>),
}

#[derive(Debug, Deserialize)]
struct RowId {
    id: Uuid,
}

fn decode_change<T: serde::de::DeserializeOwned>(
    raw: &RawEnvelope,
) -> Result<ChangeEvent<T>, EventError> {
    match raw.event_type.as_str() {
        "INSERT" => {
            let row = raw.new.clone().ok_or(EventError::MissingRow("new"))?;
            Ok(ChangeEvent::Insert(serde_json::from_value(row)?))
        }
        "UPDATE" => {
            let row = raw.new.clone().ok_or(EventError::MissingRow("new"))?;
            Ok(ChangeEvent::Update(serde_json::from_value(row)?))
        }
        "DELETE" => {
            let row = raw.old.clone().ok_or(EventError::MissingRow("old"))?;
            let RowId { id } = serde_json::from_value(row)?;
            Ok(ChangeEvent::Delete { id })
        }
        other => Err(EventError::UnknownEventType(other.to_string())),
    }
}

impl TableEvent {
    pub fn decode(raw: &RawEnvelope) -> Result<TableEvent, EventError> {
        match raw.table.as_str() {
            Message::TABLE => Ok(TableEvent::Message(decode_change(raw)?)),
            ProjectMember::TABLE => Ok(TableEvent::Member(decode_change(raw)?)),
            Profile::TABLE => Ok(TableEvent::Profile(decode_change(raw)?)),
            other => Err(EventError::UnknownTable(other.to_string())),
        }
    }
}
