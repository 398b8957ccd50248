use cutroom_chat::MemberRoster;
use cutroom_chat::membership::derive_role;
use cutroom_store::ChangeEvent;
use cutroom_store::models::{MemberRole, MemberStatus};
use uuid::Uuid;

use crate::fixtures::rows;

#[test]
fn assignment_outranks_shared_membership() {
    let owner = Uuid::new_v4();
    let editor = Uuid::new_v4();
    let mut project = rows::project(owner);
    project.editor_id = Some(editor);

    // The editor also holds an approved shared row; the assignment wins.
    let members = vec![rows::member(project.id, editor, MemberStatus::Approved)];

    assert_eq!(derive_role(&project, &members, owner), Some(MemberRole::Owner));
    assert_eq!(derive_role(&project, &members, editor), Some(MemberRole::Editor));

    let roster = MemberRoster::new(project, members);
    let effective = roster.effective();
    assert_eq!(
        effective
            .iter()
            .filter(|m| m.account_id == Some(editor))
            .count(),
        1,
        "one entry per account regardless of how many rows grant access"
    );
}

#[test]
fn approval_lifecycle_flows_through_feed_events() {
    let owner = Uuid::new_v4();
    let requester = Uuid::new_v4();
    let project = rows::project(owner);
    let request = rows::member(project.id, requester, MemberStatus::Pending);
    let request_id = request.id;

    let mut roster = MemberRoster::new(project, vec![request]);
    assert_eq!(roster.pending().len(), 1);
    assert_eq!(roster.role_of(requester), None, "pending grants nothing");

    let mut approved = roster.find(request_id).unwrap().clone();
    approved.status = MemberStatus::Approved;
    roster.apply(ChangeEvent::Update(approved));

    assert!(roster.pending().is_empty());
    assert_eq!(roster.role_of(requester), Some(MemberRole::Shared));
}

#[test]
fn rejected_and_removed_members_lose_access() {
    let owner = Uuid::new_v4();
    let outsider = Uuid::new_v4();
    let project = rows::project(owner);
    let row = rows::member(project.id, outsider, MemberStatus::Rejected);

    let roster = MemberRoster::new(project.clone(), vec![row]);
    assert_eq!(roster.role_of(outsider), None);
    assert!(!roster.can_moderate(outsider));

    let removed = rows::member(project.id, outsider, MemberStatus::Removed);
    let roster = MemberRoster::new(project, vec![removed]);
    assert_eq!(roster.role_of(outsider), None);
}

#[test]
fn guests_are_listed_without_an_account() {
    let owner = Uuid::new_v4();
    let project = rows::project(owner);
    let roster = MemberRoster::new(project.clone(), vec![rows::guest(project.id, "Reviewer 7")]);

    let effective = roster.effective();
    let guest = effective
        .iter()
        .find(|m| m.guest_name.as_deref() == Some("Reviewer 7"))
        .expect("guest row is visible");
    assert_eq!(guest.account_id, None);
    assert_eq!(guest.role, MemberRole::Shared);
}

#[test]
fn member_delete_events_prune_the_roster() {
    let owner = Uuid::new_v4();
    let shared = Uuid::new_v4();
    let project = rows::project(owner);
    let row = rows::member(project.id, shared, MemberStatus::Approved);
    let row_id = row.id;

    let mut roster = MemberRoster::new(project, vec![row]);
    assert_eq!(roster.role_of(shared), Some(MemberRole::Shared));

    roster.apply(ChangeEvent::Delete { id: row_id });
    assert_eq!(roster.role_of(shared), None);
    assert!(roster.find(row_id).is_none());
}
