//! Change-feed envelopes, decoded at the boundary and applied to the live
//! structures, exactly as the room's event pump does it.

use cutroom_chat::{MemberRoster, Timeline, TimelineChange};
use cutroom_store::models::MemberRole;
use cutroom_store::{RawEnvelope, TableEvent};
use uuid::Uuid;

use crate::fixtures::rows;

fn envelope(value: serde_json::Value) -> RawEnvelope {
    serde_json::from_value(value).unwrap()
}

#[test]
fn message_envelopes_flow_into_the_timeline() {
    let project = Uuid::new_v4();
    let me = Uuid::new_v4();
    let other = Uuid::new_v4();
    let mut timeline = Timeline::new(project, me, 30);

    let row = rows::message(project, other, "frame 1204 flickers", rows::at(0));
    let raw = envelope(serde_json::json!({
        "eventType": "INSERT",
        "table": "messages",
        "new": serde_json::to_value(&row).unwrap(),
    }));

    match TableEvent::decode(&raw).unwrap() {
        TableEvent::Message(change) => {
            assert_eq!(
                timeline.apply(change),
                Some(TimelineChange::InsertedForeign(row.id))
            );
        }
        other => panic!("unexpected: {other:?}"),
    }
    assert_eq!(timeline.entries()[0].message.content, "frame 1204 flickers");
}

#[test]
fn membership_envelopes_flow_into_the_roster() {
    let owner = Uuid::new_v4();
    let requester = Uuid::new_v4();
    let project = rows::project(owner);
    let mut roster = MemberRoster::new(project.clone(), vec![]);

    let mut row = rows::member(project.id, requester, Default::default());
    let raw = envelope(serde_json::json!({
        "eventType": "INSERT",
        "table": "project_members",
        "new": serde_json::to_value(&row).unwrap(),
    }));
    match TableEvent::decode(&raw).unwrap() {
        TableEvent::Member(change) => roster.apply(change),
        other => panic!("unexpected: {other:?}"),
    }
    assert_eq!(roster.pending().len(), 1);

    row.status = cutroom_store::models::MemberStatus::Approved;
    let raw = envelope(serde_json::json!({
        "eventType": "UPDATE",
        "table": "project_members",
        "new": serde_json::to_value(&row).unwrap(),
    }));
    match TableEvent::decode(&raw).unwrap() {
        TableEvent::Member(change) => roster.apply(change),
        other => panic!("unexpected: {other:?}"),
    }
    assert!(roster.pending().is_empty());
    assert_eq!(roster.role_of(requester), Some(MemberRole::Shared));
}

#[test]
fn foreign_tables_are_rejected_at_the_boundary() {
    let raw = envelope(serde_json::json!({
        "eventType": "INSERT",
        "table": "render_jobs",
        "new": { "id": Uuid::new_v4() },
    }));
    assert!(TableEvent::decode(&raw).is_err());
}
