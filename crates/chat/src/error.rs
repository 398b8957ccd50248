use cutroom_store::StoreError;
use cutroom_store::models::MemberStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Denied: {0}")]
    Denied(String),
    #[error("Membership entry not found")]
    MemberNotFound,
    #[error("Invalid membership transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: MemberStatus,
        to: MemberStatus,
    },
}
