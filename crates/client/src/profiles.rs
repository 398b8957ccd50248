use cutroom_store::models::Profile;
use cutroom_store::{Filter, StoreClient, StoreError};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Fetch-once cache of sender profiles used to enrich foreign inserts with
/// display name and avatar.
#[derive(Clone)]
pub struct ProfileCache {
    store: StoreClient,
    cache: Arc<DashMap<Uuid, Profile>>,
}

impl ProfileCache {
    pub fn new(store: StoreClient) -> Self {
        Self {
            store,
            cache: Arc::new(DashMap::new()),
        }
    }

    pub async fn get(&self, account_id: Uuid) -> Result<Profile, StoreError> {
        if let Some(profile) = self.cache.get(&account_id) {
            return Ok(profile.clone());
        }
        debug!(%account_id, "Fetching profile");
        let profile: Profile = self
            .store
            .select_one(Profile::TABLE, &Filter::new().eq("id", account_id))
            .await?;
        self.cache.insert(account_id, profile.clone());
        Ok(profile)
    }

    /// Overwrites from a profile change event so later lookups see the edit.
    pub fn insert(&self, profile: Profile) {
        self.cache.insert(profile.id, profile);
    }
}
