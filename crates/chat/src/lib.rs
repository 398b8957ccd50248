pub mod error;
pub mod membership;
pub mod moderation;
pub mod notify;
pub mod presence;
pub mod reactions;
pub mod system;
pub mod timeline;

pub use error::ChatError;
pub use membership::{EffectiveMember, MemberRoster};
pub use moderation::ModerationService;
pub use notify::{NotificationAction, NotificationPolicy, Notifier};
pub use presence::{PresenceSet, PresenceSnippet, TypingDebouncer, TypingSet, TypingSignal};
pub use timeline::{Draft, Entry, EntryId, LocalStatus, SenderInfo, Timeline, TimelineChange};
