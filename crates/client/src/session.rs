use cutroom_store::models::Profile;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;
use uuid::Uuid;

/// Explicit session context for the signed-in account, injected into every
/// component that needs to know who is acting. There is no module-level
/// current-user cache; sign-out is exactly [`Session::invalidate`] followed
/// by dropping the room handles.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    account_id: Uuid,
    profile: Profile,
    access_token: String,
    revoked: AtomicBool,
}

impl Session {
    pub fn new(profile: Profile, access_token: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                account_id: profile.id,
                profile,
                access_token: access_token.into(),
                revoked: AtomicBool::new(false),
            }),
        }
    }

    pub fn account_id(&self) -> Uuid {
        self.inner.account_id
    }

    pub fn profile(&self) -> &Profile {
        &self.inner.profile
    }

    pub fn display_name(&self) -> &str {
        &self.inner.profile.display_name
    }

    pub fn access_token(&self) -> &str {
        &self.inner.access_token
    }

    pub fn is_valid(&self) -> bool {
        !self.inner.revoked.load(Ordering::Acquire)
    }

    /// Marks the session signed out. Every holder of this context sees the
    /// revocation; results of requests still in flight are discarded by
    /// their callers.
    pub fn invalidate(&self) {
        self.inner.revoked.store(true, Ordering::Release);
        info!(account_id = %self.inner.account_id, "Session invalidated");
    }
}
