use cutroom_chat::ChatError;
use cutroom_store::StoreError;
use thiserror::Error;

use crate::realtime::RealtimeError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Chat(#[from] ChatError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Realtime(#[from] RealtimeError),
    #[error("Message not found")]
    MessageNotFound,
    #[error("Session is no longer valid")]
    SignedOut,
}
