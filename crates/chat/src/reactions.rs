use cutroom_store::models::Message;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionChange {
    Added,
    Removed,
}

/// Toggle semantics: reacting with an emoji the account already used removes
/// that reaction instead of stacking a second one.
pub fn toggle(message: &mut Message, emoji: &str, account_id: Uuid) -> ReactionChange {
    if let Some(accounts) = message.reactions.get_mut(emoji) {
        if accounts.remove(&account_id) {
            if accounts.is_empty() {
                message.reactions.remove(emoji);
            }
            return ReactionChange::Removed;
        }
    }
    message
        .reactions
        .entry(emoji.to_string())
        .or_default()
        .insert(account_id);
    ReactionChange::Added
}
