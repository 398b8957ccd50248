use cutroom_chat::{NotificationAction, NotificationPolicy};
use cutroom_config::settings::NotificationSettings;
use uuid::Uuid;

use crate::fixtures::rows;

fn policy(sound: bool, desktop: bool) -> NotificationPolicy {
    NotificationPolicy::new(NotificationSettings {
        sound_enabled: sound,
        desktop_enabled: desktop,
    })
}

#[test]
fn each_message_notifies_exactly_once() {
    let mut policy = policy(true, true);
    let row = rows::message(Uuid::new_v4(), Uuid::new_v4(), "new cut posted", rows::at(0));

    let first = policy.on_foreign_insert(&row, Some("Dana"), false);
    assert!(!first.is_empty());

    // The same row arriving again (feed echo after a refetch) is silent.
    assert!(policy.on_foreign_insert(&row, Some("Dana"), false).is_empty());
}

#[test]
fn focused_viewers_hear_sound_but_see_no_toast() {
    let mut policy = policy(true, true);
    let row = rows::message(Uuid::new_v4(), Uuid::new_v4(), "ping", rows::at(0));

    let actions = policy.on_foreign_insert(&row, Some("Dana"), true);
    assert_eq!(actions, vec![NotificationAction::Sound]);
}

#[test]
fn unfocused_viewers_get_the_full_fanout() {
    let mut policy = policy(true, true);
    let row = rows::message(Uuid::new_v4(), Uuid::new_v4(), "ping", rows::at(0));

    let actions = policy.on_foreign_insert(&row, Some("Dana"), false);
    assert!(actions.contains(&NotificationAction::Sound));
    assert!(actions.iter().any(|a| matches!(
        a,
        NotificationAction::Toast { title, .. } if title == "Dana"
    )));
    assert!(actions
        .iter()
        .any(|a| matches!(a, NotificationAction::Desktop { .. })));
}

#[test]
fn settings_silence_their_channels() {
    let mut policy = policy(false, false);
    let row = rows::message(Uuid::new_v4(), Uuid::new_v4(), "ping", rows::at(0));

    let actions = policy.on_foreign_insert(&row, None, false);
    assert!(!actions.contains(&NotificationAction::Sound));
    assert!(actions.iter().any(|a| matches!(
        a,
        NotificationAction::Toast { title, .. } if title == "New message"
    )));
    assert!(!actions
        .iter()
        .any(|a| matches!(a, NotificationAction::Desktop { .. })));
}
