use std::sync::Arc;

use chrono::Utc;

use crate::api::AnalyticsApi;
use crate::db::Repository;
use crate::error::Result;
use crate::insights::InsightAggregator;
use crate::models::{
    Account, AccountSummary, CachedPost, CachedProfile, StatusPatch, SyncState, SyncStatus,
};

use super::freshness;

/// Everything the dashboard needs for one account, assembled from the cache
/// or from a fresh sync. The shape is identical either way; `from_cache`
/// says which path produced it.
#[derive(Debug, Clone)]
pub struct AccountData {
    pub profile: Option<CachedProfile>,
    pub posts: Vec<CachedPost>,
    pub summary: AccountSummary,
    pub status: Option<SyncStatus>,
    pub from_cache: bool,
}

pub struct SyncEngine {
    repository: Repository,
    api: Arc<dyn AnalyticsApi>,
    aggregator: InsightAggregator,
    post_limit: u32,
}

impl SyncEngine {
    pub fn new(repository: Repository, api: Arc<dyn AnalyticsApi>, post_limit: u32) -> Self {
        let aggregator = InsightAggregator::new(Arc::clone(&api));
        Self {
            repository,
            api,
            aggregator,
            post_limit,
        }
    }

    /// Main entry point for the dashboard. `force_refresh` bypasses every
    /// freshness check but still degrades to cached data on failure, so this
    /// never raises.
    pub async fn get_data_with_cache(&self, account: &Account, force_refresh: bool) -> AccountData {
        if force_refresh {
            match self.force_sync(account).await {
                Ok(data) => data,
                Err(e) => {
                    tracing::warn!(
                        "Forced refresh failed for account {}, serving cached data: {}",
                        account.id,
                        e
                    );
                    self.read_cached(account.id, true).await
                }
            }
        } else {
            self.smart_sync(account).await
        }
    }

    /// Decide between serving the cache and syncing. In order: fresh
    /// non-empty cache wins, then a sync already marked in progress, then
    /// the resync cooldown; only when all three pass does a real sync run.
    /// A failed sync degrades to whatever the cache holds.
    pub async fn smart_sync(&self, account: &Account) -> AccountData {
        let cached = self.read_cached(account.id, true).await;
        let now = Utc::now();

        if let Some(newest) = cached.posts.iter().map(|p| p.last_updated).max() {
            if freshness::is_valid(newest, now) {
                tracing::debug!(
                    "Serving fresh cache for account {} ({} posts)",
                    account.id,
                    cached.posts.len()
                );
                return cached;
            }
        }

        if cached
            .status
            .as_ref()
            .is_some_and(|s| s.state == SyncState::InProgress)
        {
            tracing::debug!(
                "Sync already in progress for account {}, serving cache as-is",
                account.id
            );
            return cached;
        }

        let last_full_sync = cached.status.as_ref().and_then(|s| s.last_full_sync);
        if freshness::is_too_soon_to_resync(last_full_sync, now) {
            tracing::debug!(
                "Resync cooldown active for account {}, serving stale cache",
                account.id
            );
            return cached;
        }

        match self.force_sync(account).await {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(
                    "Sync failed for account {}, serving cached data: {}",
                    account.id,
                    e
                );
                // Re-read so the served status reflects the failure.
                self.read_cached(account.id, true).await
            }
        }
    }

    /// Run a full sync unconditionally. This is the only path that raises;
    /// any failure is recorded on the status row before the error surfaces.
    pub async fn force_sync(&self, account: &Account) -> Result<AccountData> {
        match self.run_sync(account).await {
            Ok(posts_count) => {
                tracing::info!("Synced account {}: {} posts", account.id, posts_count);
                Ok(self.read_cached(account.id, false).await)
            }
            Err(e) => {
                tracing::error!("Sync failed for account {}: {}", account.id, e);
                let patch = StatusPatch::failed(e.to_string());
                if let Err(status_err) = self.repository.upsert_status(account.id, patch).await {
                    tracing::warn!(
                        "Failed to record sync failure for account {}: {}",
                        account.id,
                        status_err
                    );
                }
                Err(e)
            }
        }
    }

    pub async fn get_cache_status(&self, account_id: i64) -> Option<SyncStatus> {
        match self.repository.get_status(account_id).await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!("Failed to read sync status for account {}: {}", account_id, e);
                None
            }
        }
    }

    pub async fn clear_cache(&self, account_id: i64) -> Result<()> {
        self.repository.clear(account_id).await
    }

    async fn run_sync(&self, account: &Account) -> Result<usize> {
        // Old databases can hold duplicate status rows; collapse them before
        // upserting against the unique index.
        self.repository.dedupe_status(account.id).await?;
        self.repository
            .upsert_status(account.id, StatusPatch::in_progress())
            .await?;

        let profile = self
            .api
            .get_account_profile(&account.ig_user_id, &account.access_token)
            .await?;
        let raw_posts = self
            .api
            .list_posts(&account.ig_user_id, &account.access_token, self.post_limit)
            .await?;

        let posts = self.aggregator.enrich_posts(account, raw_posts).await;

        let now = Utc::now();
        self.repository.replace_posts(account.id, &posts, now).await?;
        self.repository.save_profile(account.id, &profile, now).await?;
        self.repository
            .upsert_status(account.id, StatusPatch::completed(posts.len() as i64, now))
            .await?;

        Ok(posts.len())
    }

    /// Assemble served data from the cache alone. Read failures degrade to
    /// missing pieces instead of raising.
    async fn read_cached(&self, account_id: i64, from_cache: bool) -> AccountData {
        let profile = match self.repository.get_profile(account_id).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!(
                    "Failed to read cached profile for account {}: {}",
                    account_id,
                    e
                );
                None
            }
        };
        let posts = match self.repository.get_posts(account_id).await {
            Ok(posts) => posts,
            Err(e) => {
                tracing::warn!(
                    "Failed to read cached posts for account {}: {}",
                    account_id,
                    e
                );
                Vec::new()
            }
        };
        let status = match self.repository.get_status(account_id).await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(
                    "Failed to read sync status for account {}: {}",
                    account_id,
                    e
                );
                None
            }
        };

        let summary = AccountSummary::from_posts(posts.iter().map(|p| &p.snapshot));
        AccountData {
            profile,
            posts,
            summary,
            status,
            from_cache,
        }
    }
}
