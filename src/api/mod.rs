mod client;

pub use client::{GraphApiClient, DEFAULT_GRAPH_API_URL};

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{MetricValue, ProfileSnapshot, RawPost};

/// Remote analytics surface the sync engine talks to. Implemented by
/// [`GraphApiClient`] in production and by in-memory fakes in tests.
#[async_trait]
pub trait AnalyticsApi: Send + Sync {
    /// List the account's most recent posts, newest first, without insights.
    async fn list_posts(
        &self,
        ig_user_id: &str,
        access_token: &str,
        limit: u32,
    ) -> Result<Vec<RawPost>>;

    async fn get_account_profile(
        &self,
        ig_user_id: &str,
        access_token: &str,
    ) -> Result<ProfileSnapshot>;

    /// Fetch the requested metrics for one post. A rejected metric set is an
    /// error; entries the API returned without a usable value are dropped,
    /// so an `Ok` can legitimately be empty.
    async fn get_post_insights(
        &self,
        media_id: &str,
        access_token: &str,
        metrics: &[&str],
    ) -> Result<Vec<MetricValue>>;

    /// Follower count for the reach-estimate clamp, `None` when the API
    /// does not expose it.
    async fn get_follower_count(
        &self,
        ig_user_id: &str,
        access_token: &str,
    ) -> Result<Option<i64>>;
}
