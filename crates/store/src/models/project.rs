use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The parent project of a conversation. Its owner/editor/client
/// assignments are one of the two inputs to role derivation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub editor_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Project {
    pub const TABLE: &'static str = "projects";
}
