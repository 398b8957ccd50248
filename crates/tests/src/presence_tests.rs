use std::time::{Duration, Instant};

use cutroom_chat::{PresenceSet, PresenceSnippet, TypingDebouncer, TypingSet, TypingSignal};
use uuid::Uuid;

fn snippet(name: &str) -> PresenceSnippet {
    PresenceSnippet {
        account_id: Uuid::new_v4(),
        display_name: name.to_string(),
        avatar_url: None,
    }
}

#[test]
fn a_typing_burst_is_one_start_and_one_trailing_stop() {
    let mut debouncer = TypingDebouncer::new(1500);
    let t0 = Instant::now();

    assert_eq!(debouncer.on_keystroke(t0), Some(TypingSignal::Start));
    assert_eq!(debouncer.on_keystroke(t0 + Duration::from_millis(300)), None);
    assert_eq!(debouncer.on_keystroke(t0 + Duration::from_millis(900)), None);

    // Still inside the window measured from the last keystroke.
    assert_eq!(debouncer.poll(t0 + Duration::from_millis(2000)), None);
    assert_eq!(
        debouncer.poll(t0 + Duration::from_millis(2400)),
        Some(TypingSignal::Stop)
    );
    assert_eq!(debouncer.poll(t0 + Duration::from_millis(3000)), None);
}

#[test]
fn sending_stops_typing_immediately() {
    let mut debouncer = TypingDebouncer::new(1500);
    let t0 = Instant::now();

    assert_eq!(debouncer.on_keystroke(t0), Some(TypingSignal::Start));
    assert_eq!(debouncer.on_send(), Some(TypingSignal::Stop));
    // No trailing stop after the explicit one.
    assert_eq!(debouncer.poll(t0 + Duration::from_secs(10)), None);
    // The next burst starts fresh.
    assert_eq!(
        debouncer.on_keystroke(t0 + Duration::from_secs(11)),
        Some(TypingSignal::Start)
    );
}

#[test]
fn typing_indicators_expire_without_a_stop() {
    let mut set = TypingSet::new(6);
    let t0 = Instant::now();
    let chatty = Uuid::new_v4();
    let quiet = Uuid::new_v4();

    set.started(chatty, t0);
    set.started(quiet, t0);
    set.stopped(quiet);
    assert_eq!(set.typing_accounts(t0 + Duration::from_secs(1)).len(), 1);

    // The lost-stop case: the entry ages out on its own.
    assert!(set.typing_accounts(t0 + Duration::from_secs(7)).is_empty());
}

#[test]
fn presence_tracks_joins_leaves_and_heartbeats() {
    let presence = PresenceSet::new(60);
    let t0 = Instant::now();
    let a = snippet("Alex");
    let b = snippet("Bo");

    presence.joined(a.clone(), t0);
    presence.joined(b.clone(), t0);
    assert_eq!(presence.online(t0).len(), 2);
    assert!(presence.is_online(a.account_id, t0));

    presence.heartbeat(a.account_id, t0 + Duration::from_secs(30));
    presence.left(b.account_id);
    assert_eq!(presence.online(t0 + Duration::from_secs(30)).len(), 1);
    assert!(!presence.is_online(b.account_id, t0));

    presence.clear();
    assert!(presence.online(t0).is_empty());
}

#[test]
fn a_participant_whose_leave_frame_is_lost_ages_out() {
    let presence = PresenceSet::new(60);
    let t0 = Instant::now();
    let gone = snippet("Gone");
    let here = snippet("Here");

    presence.joined(gone.clone(), t0);
    presence.joined(here.clone(), t0);
    // Only one of them keeps heartbeating.
    presence.heartbeat(here.account_id, t0 + Duration::from_secs(55));

    let online = presence.online(t0 + Duration::from_secs(70));
    assert_eq!(online.len(), 1);
    assert_eq!(online[0].account_id, here.account_id);
    assert!(!presence.is_online(gone.account_id, t0 + Duration::from_secs(70)));
}
