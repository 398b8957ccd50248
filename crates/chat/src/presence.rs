use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Profile snippet announced on the presence channel. Ephemeral: lives only
/// in channel memory for the lifetime of the subscription.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PresenceSnippet {
    pub account_id: Uuid,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone)]
struct PresenceRecord {
    snippet: PresenceSnippet,
    last_seen: Instant,
}

/// Current set of online participants for one conversation. Records expire
/// without a heartbeat refresh, so a lost leave announcement cannot pin a
/// participant online forever.
pub struct PresenceSet {
    expiry: Duration,
    records: DashMap<Uuid, PresenceRecord>,
}

impl PresenceSet {
    pub fn new(expiry_secs: u64) -> Self {
        Self {
            expiry: Duration::from_secs(expiry_secs),
            records: DashMap::new(),
        }
    }

    pub fn joined(&self, snippet: PresenceSnippet, now: Instant) {
        self.records.insert(
            snippet.account_id,
            PresenceRecord {
                snippet,
                last_seen: now,
            },
        );
    }

    pub fn left(&self, account_id: Uuid) {
        self.records.remove(&account_id);
    }

    pub fn heartbeat(&self, account_id: Uuid, now: Instant) {
        if let Some(mut record) = self.records.get_mut(&account_id) {
            record.last_seen = now;
        }
    }

    pub fn online(&self, now: Instant) -> Vec<PresenceSnippet> {
        self.records
            .retain(|_, r| now.duration_since(r.last_seen) < self.expiry);
        let mut online: Vec<PresenceSnippet> =
            self.records.iter().map(|r| r.snippet.clone()).collect();
        online.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        online
    }

    pub fn is_online(&self, account_id: Uuid, now: Instant) -> bool {
        self.records
            .get(&account_id)
            .is_some_and(|r| now.duration_since(r.last_seen) < self.expiry)
    }

    pub fn clear(&self) {
        self.records.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingSignal {
    Start,
    Stop,
}

/// Collapses local keystroke bursts into start/stop announcements. The first
/// keystroke produces a start; silence for the debounce window (or an
/// explicit send) produces the stop.
#[derive(Debug)]
pub struct TypingDebouncer {
    window: Duration,
    started: bool,
    last_keystroke: Option<Instant>,
}

impl TypingDebouncer {
    pub fn new(window_ms: u64) -> Self {
        Self {
            window: Duration::from_millis(window_ms),
            started: false,
            last_keystroke: None,
        }
    }

    pub fn on_keystroke(&mut self, now: Instant) -> Option<TypingSignal> {
        self.last_keystroke = Some(now);
        if self.started {
            return None;
        }
        self.started = true;
        Some(TypingSignal::Start)
    }

    /// Ticked periodically; emits the stop once the burst has gone quiet.
    pub fn poll(&mut self, now: Instant) -> Option<TypingSignal> {
        match self.last_keystroke {
            Some(last) if self.started && now.duration_since(last) >= self.window => {
                self.started = false;
                Some(TypingSignal::Stop)
            }
            _ => None,
        }
    }

    /// Sending the message ends the typing state immediately.
    pub fn on_send(&mut self) -> Option<TypingSignal> {
        if self.started {
            self.started = false;
            self.last_keystroke = None;
            return Some(TypingSignal::Stop);
        }
        None
    }
}

/// Remote participants currently typing. Entries expire so a lost stop
/// announcement cannot wedge the indicator. No cross-participant ordering is
/// assumed; only the current set matters.
#[derive(Debug)]
pub struct TypingSet {
    expiry: Duration,
    entries: HashMap<Uuid, Instant>,
}

impl TypingSet {
    pub fn new(expiry_secs: u64) -> Self {
        Self {
            expiry: Duration::from_secs(expiry_secs),
            entries: HashMap::new(),
        }
    }

    pub fn started(&mut self, account_id: Uuid, now: Instant) {
        self.entries.insert(account_id, now);
    }

    pub fn stopped(&mut self, account_id: Uuid) {
        self.entries.remove(&account_id);
    }

    pub fn typing_accounts(&mut self, now: Instant) -> BTreeSet<Uuid> {
        self.entries
            .retain(|_, seen| now.duration_since(*seen) < self.expiry);
        self.entries.keys().copied().collect()
    }
}
