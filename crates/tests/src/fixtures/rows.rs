//! Row builders shared by the scenario tests. Everything is deterministic
//! except the identifiers.

use chrono::{DateTime, Duration, TimeZone, Utc};
use cutroom_store::models::{
    DeliveryStatus, MemberStatus, Message, MessageKind, Profile, Project, ProjectMember,
};
use uuid::Uuid;

/// Fixed origin so ordering assertions read as offsets.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap()
}

pub fn at(seconds: i64) -> DateTime<Utc> {
    t0() + Duration::seconds(seconds)
}

pub fn profile(name: &str) -> Profile {
    Profile {
        id: Uuid::new_v4(),
        display_name: name.to_string(),
        avatar_url: None,
        email: Some(format!("{}@cutroom.test", name.to_lowercase())),
        created_at: t0(),
    }
}

pub fn project(owner_id: Uuid) -> Project {
    Project {
        id: Uuid::new_v4(),
        name: "Launch trailer".to_string(),
        owner_id,
        editor_id: None,
        client_id: None,
        created_at: t0(),
    }
}

pub fn member(project_id: Uuid, account_id: Uuid, status: MemberStatus) -> ProjectMember {
    ProjectMember {
        id: Uuid::new_v4(),
        project_id,
        account_id: Some(account_id),
        guest_name: None,
        status,
        is_active: true,
        created_at: t0(),
        updated_at: t0(),
    }
}

pub fn guest(project_id: Uuid, name: &str) -> ProjectMember {
    ProjectMember {
        id: Uuid::new_v4(),
        project_id,
        account_id: None,
        guest_name: Some(name.to_string()),
        status: MemberStatus::Approved,
        is_active: true,
        created_at: t0(),
        updated_at: t0(),
    }
}

pub fn message(
    project_id: Uuid,
    sender_id: Uuid,
    content: &str,
    created_at: DateTime<Utc>,
) -> Message {
    Message {
        id: Uuid::new_v4(),
        project_id,
        sender_id,
        content: content.to_string(),
        reply_to_id: None,
        attachment_url: None,
        kind: MessageKind::User,
        is_edited: false,
        is_pinned: false,
        is_starred: false,
        reactions: Default::default(),
        read_by: Default::default(),
        status: DeliveryStatus::Sent,
        created_at,
    }
}

pub fn system_message(
    project_id: Uuid,
    sender_id: Uuid,
    payload: &serde_json::Value,
    created_at: DateTime<Utc>,
) -> Message {
    let mut row = message(project_id, sender_id, &payload.to_string(), created_at);
    row.kind = MessageKind::System;
    row
}
