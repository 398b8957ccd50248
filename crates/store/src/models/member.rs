use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A row of the explicit membership table. Identifies a participant either
/// by account id or, for guests, by display name alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMember {
    pub id: Uuid,
    pub project_id: Uuid,
    pub account_id: Option<Uuid>,
    pub guest_name: Option<String>,
    #[serde(default)]
    pub status: MemberStatus,
    #[serde(default)]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Removed,
}

impl MemberStatus {
    /// Allowed edges: pending -> approved, pending -> rejected,
    /// approved -> removed. Nothing leaves removed.
    pub fn can_transition(self, to: MemberStatus) -> bool {
        matches!(
            (self, to),
            (MemberStatus::Pending, MemberStatus::Approved)
                | (MemberStatus::Pending, MemberStatus::Rejected)
                | (MemberStatus::Approved, MemberStatus::Removed)
        )
    }
}

/// Effective role of a participant, derived at read time by
/// cross-referencing the project's assignments — never stored as a column.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Owner,
    Editor,
    Client,
    Shared,
}

impl MemberRole {
    /// Lower is higher priority: owner > editor > client > shared.
    pub fn precedence(self) -> u8 {
        match self {
            MemberRole::Owner => 0,
            MemberRole::Editor => 1,
            MemberRole::Client => 2,
            MemberRole::Shared => 3,
        }
    }
}

impl ProjectMember {
    pub const TABLE: &'static str = "project_members";
}
