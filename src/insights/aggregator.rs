use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use crate::api::AnalyticsApi;
use crate::models::{
    engagement_rate_percent, Account, MetricValue, PostInsights, PostSnapshot, RawPost,
};

use super::{reach, strategy};

/// Posts fetched concurrently per batch.
const BATCH_SIZE: usize = 5;
/// Pause between batches to stay under the per-app rate limits.
const BATCH_PACING: Duration = Duration::from_millis(100);

pub struct InsightAggregator {
    api: Arc<dyn AnalyticsApi>,
}

impl InsightAggregator {
    pub fn new(api: Arc<dyn AnalyticsApi>) -> Self {
        Self { api }
    }

    /// Enrich raw posts with per-post insights and derived engagement
    /// fields, preserving input order. Posts whose insight fetches all fail
    /// degrade to zero or estimated metrics; this method itself never fails.
    pub async fn enrich_posts(&self, account: &Account, posts: Vec<RawPost>) -> Vec<PostSnapshot> {
        if posts.is_empty() {
            return Vec::new();
        }

        let follower_count = self.fetch_follower_count(account).await;

        let mut enriched = Vec::with_capacity(posts.len());
        let batch_count = posts.len().div_ceil(BATCH_SIZE);

        for (index, batch) in posts.chunks(BATCH_SIZE).enumerate() {
            let fetches = batch
                .iter()
                .map(|post| self.fetch_with_fallback(post, &account.access_token));
            let results = join_all(fetches).await;

            for (post, metrics) in batch.iter().zip(results) {
                enriched.push(build_snapshot(post, metrics, follower_count));
            }

            // Pace between batches only; the last batch ends the sync.
            if index + 1 < batch_count {
                tokio::time::sleep(BATCH_PACING).await;
            }
        }

        enriched
    }

    /// Fetched once per aggregation, best-effort: without it the reach
    /// estimator just runs unclamped.
    async fn fetch_follower_count(&self, account: &Account) -> Option<i64> {
        match self
            .api
            .get_follower_count(&account.ig_user_id, &account.access_token)
            .await
        {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(
                    "Failed to fetch follower count for account {}: {}",
                    account.id,
                    e
                );
                None
            }
        }
    }

    /// Walk the metric-set cascade for the post's content type and return
    /// the first response carrying at least one value. `None` when every
    /// level was rejected or empty, which is normal for very old posts.
    async fn fetch_with_fallback(
        &self,
        post: &RawPost,
        access_token: &str,
    ) -> Option<Vec<MetricValue>> {
        for metric_set in strategy::metric_sets(post.media_type) {
            match self
                .api
                .get_post_insights(&post.id, access_token, metric_set)
                .await
            {
                Ok(values) if !values.is_empty() => return Some(values),
                Ok(_) => {
                    tracing::debug!(
                        "Empty insights for post {} with metrics {:?}",
                        post.id,
                        metric_set
                    );
                }
                Err(e) => {
                    tracing::debug!(
                        "Insights rejected for post {} with metrics {:?}: {}",
                        post.id,
                        metric_set,
                        e
                    );
                }
            }
        }
        tracing::warn!(
            "No insights available for post {}, falling back to estimates",
            post.id
        );
        None
    }
}

fn build_snapshot(
    post: &RawPost,
    metrics: Option<Vec<MetricValue>>,
    follower_count: Option<i64>,
) -> PostSnapshot {
    let insights = derive_insights(post, metrics.as_deref().unwrap_or(&[]), follower_count);
    PostSnapshot {
        post_id: post.id.clone(),
        media_type: post.media_type,
        caption: post.caption.clone(),
        permalink: post.permalink.clone(),
        media_url: post.media_url.clone(),
        thumbnail_url: post.thumbnail_url.clone(),
        posted_at: post.timestamp,
        like_count: post.like_count,
        comments_count: post.comments_count,
        insights,
    }
}

/// Fold raw metric values into the insight shape served to the dashboard.
/// Carousel metrics arrive under album-scoped names and are folded into the
/// plain ones; play counts stand in for impressions where the API stopped
/// reporting them.
fn derive_insights(
    post: &RawPost,
    metrics: &[MetricValue],
    follower_count: Option<i64>,
) -> PostInsights {
    let mut reach = 0;
    let mut impressions = 0;
    let mut saved = 0;
    let mut shares = 0;
    let mut likes = None;
    let mut comments = None;
    let mut total_interactions = None;
    let mut plays = None;

    for metric in metrics {
        match metric.name.as_str() {
            "reach" | "carousel_album_reach" => reach = metric.value,
            "impressions" | "carousel_album_impressions" => impressions = metric.value,
            "saved" | "carousel_album_saved" => saved = metric.value,
            "shares" => shares = metric.value,
            "likes" => likes = Some(metric.value),
            "comments" => comments = Some(metric.value),
            "total_interactions" => total_interactions = Some(metric.value),
            "plays" | "video_views" | "views" => plays = Some(metric.value),
            _ => {}
        }
    }

    if impressions == 0 {
        if let Some(plays) = plays {
            impressions = plays;
        }
    }

    let likes = likes.unwrap_or(post.like_count);
    let comments = comments.unwrap_or(post.comments_count);

    let mut reach_is_estimated = false;
    if reach <= 0 {
        reach = reach::estimate_reach(post.like_count, follower_count);
        reach_is_estimated = true;
    }

    let engagement = total_interactions.unwrap_or(likes + comments + saved + shares);
    let engagement_rate = engagement_rate_percent(engagement, reach);

    PostInsights {
        reach,
        impressions,
        saved,
        shares,
        likes,
        comments,
        total_interactions,
        engagement,
        engagement_rate,
        reach_is_estimated,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::{AppError, Result};
    use crate::models::{MediaType, ProfileSnapshot};

    fn account() -> Account {
        Account {
            id: 1,
            ig_user_id: "17841400000000000".to_string(),
            access_token: "token".to_string(),
        }
    }

    fn post(id: &str, media_type: MediaType, likes: i64, comments: i64) -> RawPost {
        RawPost {
            id: id.to_string(),
            media_type,
            caption: None,
            permalink: None,
            media_url: None,
            thumbnail_url: None,
            timestamp: None,
            like_count: likes,
            comments_count: comments,
        }
    }

    /// Replays a scripted sequence of insight responses: `Some(values)` is
    /// accepted, `None` is a rejection. Requested metric sets are recorded.
    struct ScriptedApi {
        script: Mutex<VecDeque<Option<Vec<MetricValue>>>>,
        requested: Mutex<Vec<Vec<String>>>,
        followers: Option<i64>,
        fail_followers: bool,
        follower_calls: AtomicUsize,
    }

    impl ScriptedApi {
        fn new(script: Vec<Option<Vec<MetricValue>>>, followers: Option<i64>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                requested: Mutex::new(Vec::new()),
                followers,
                fail_followers: false,
                follower_calls: AtomicUsize::new(0),
            })
        }

        fn with_failing_followers(script: Vec<Option<Vec<MetricValue>>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                requested: Mutex::new(Vec::new()),
                followers: None,
                fail_followers: true,
                follower_calls: AtomicUsize::new(0),
            })
        }

        fn requested(&self) -> Vec<Vec<String>> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AnalyticsApi for ScriptedApi {
        async fn list_posts(&self, _: &str, _: &str, _: u32) -> Result<Vec<RawPost>> {
            Ok(Vec::new())
        }

        async fn get_account_profile(&self, _: &str, _: &str) -> Result<ProfileSnapshot> {
            Err(AppError::GraphApi("not scripted".to_string()))
        }

        async fn get_post_insights(
            &self,
            _media_id: &str,
            _access_token: &str,
            metrics: &[&str],
        ) -> Result<Vec<MetricValue>> {
            self.requested
                .lock()
                .unwrap()
                .push(metrics.iter().map(|m| m.to_string()).collect());
            match self.script.lock().unwrap().pop_front() {
                Some(Some(values)) => Ok(values),
                Some(None) => Err(AppError::GraphApi(
                    "API error 400: (#100) metric not supported".to_string(),
                )),
                None => Ok(Vec::new()),
            }
        }

        async fn get_follower_count(&self, _: &str, _: &str) -> Result<Option<i64>> {
            self.follower_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_followers {
                return Err(AppError::GraphApi("API error 500".to_string()));
            }
            Ok(self.followers)
        }
    }

    /// Tracks how many insight calls are in flight at once.
    struct CountingApi {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        calls: AtomicUsize,
    }

    impl CountingApi {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl AnalyticsApi for CountingApi {
        async fn list_posts(&self, _: &str, _: &str, _: u32) -> Result<Vec<RawPost>> {
            Ok(Vec::new())
        }

        async fn get_account_profile(&self, _: &str, _: &str) -> Result<ProfileSnapshot> {
            Err(AppError::GraphApi("not scripted".to_string()))
        }

        async fn get_post_insights(
            &self,
            _: &str,
            _: &str,
            _: &[&str],
        ) -> Result<Vec<MetricValue>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(1)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(vec![MetricValue::new("reach", 10)])
        }

        async fn get_follower_count(&self, _: &str, _: &str) -> Result<Option<i64>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_first_accepted_level_stops_the_cascade() {
        let api = ScriptedApi::new(
            vec![
                None,
                None,
                Some(vec![
                    MetricValue::new("reach", 1500),
                    MetricValue::new("total_interactions", 80),
                ]),
            ],
            Some(50_000),
        );
        let aggregator = InsightAggregator::new(api.clone());

        let enriched = aggregator
            .enrich_posts(&account(), vec![post("r1", MediaType::Reel, 30, 4)])
            .await;

        let requested = api.requested();
        assert_eq!(requested.len(), 3);
        assert_eq!(requested[2], vec!["reach", "total_interactions"]);

        let insights = &enriched[0].insights;
        assert_eq!(insights.reach, 1500);
        assert!(!insights.reach_is_estimated);
        assert_eq!(insights.engagement, 80);
        assert_eq!(insights.engagement_rate, 5.33);
    }

    #[tokio::test]
    async fn test_accepted_but_empty_response_advances_the_cascade() {
        let api = ScriptedApi::new(
            vec![Some(vec![]), Some(vec![MetricValue::new("reach", 700)])],
            None,
        );
        let aggregator = InsightAggregator::new(api.clone());

        let enriched = aggregator
            .enrich_posts(&account(), vec![post("p1", MediaType::Image, 10, 1)])
            .await;

        assert_eq!(api.requested().len(), 2);
        assert_eq!(enriched[0].insights.reach, 700);
        assert!(!enriched[0].insights.reach_is_estimated);
    }

    #[tokio::test]
    async fn test_exhausted_cascade_degrades_to_estimates() {
        let api = ScriptedApi::new(vec![None, None, None, None], Some(50_000));
        let aggregator = InsightAggregator::new(api.clone());

        let enriched = aggregator
            .enrich_posts(&account(), vec![post("p1", MediaType::Image, 40, 7)])
            .await;

        // All four image levels were tried before giving up.
        assert_eq!(api.requested().len(), 4);
        // The follower count is fetched once per aggregation, not per post.
        assert_eq!(api.follower_calls.load(Ordering::SeqCst), 1);

        let insights = &enriched[0].insights;
        assert!(insights.reach_is_estimated);
        assert_eq!(insights.reach, 2000); // 40 / 0.02
        assert_eq!(insights.likes, 40);
        assert_eq!(insights.comments, 7);
        assert_eq!(insights.engagement, 47);
        assert_eq!(insights.engagement_rate, 2.35);
    }

    #[tokio::test]
    async fn test_implausible_estimate_clamps_against_followers() {
        let api = ScriptedApi::new(vec![None, None, None, None], Some(10_000));
        let aggregator = InsightAggregator::new(api);

        let enriched = aggregator
            .enrich_posts(&account(), vec![post("p1", MediaType::Image, 400, 0)])
            .await;

        // 400 likes estimate 20000 reach, over 1.5x the 10000 followers,
        // so the estimate clamps to 3000.
        assert_eq!(enriched[0].insights.reach, 3000);
        assert!(enriched[0].insights.reach_is_estimated);
    }

    #[tokio::test]
    async fn test_failed_follower_lookup_disables_the_clamp() {
        let api = ScriptedApi::with_failing_followers(vec![None, None, None, None]);
        let aggregator = InsightAggregator::new(api);

        let enriched = aggregator
            .enrich_posts(&account(), vec![post("p1", MediaType::Image, 400, 0)])
            .await;

        assert_eq!(enriched[0].insights.reach, 20_000);
        assert!(enriched[0].insights.reach_is_estimated);
    }

    #[tokio::test]
    async fn test_album_scoped_metrics_fold_into_plain_names() {
        let api = ScriptedApi::new(
            vec![Some(vec![
                MetricValue::new("carousel_album_reach", 800),
                MetricValue::new("carousel_album_impressions", 950),
                MetricValue::new("carousel_album_saved", 6),
            ])],
            None,
        );
        let aggregator = InsightAggregator::new(api);

        let enriched = aggregator
            .enrich_posts(&account(), vec![post("c1", MediaType::Carousel, 20, 2)])
            .await;

        let insights = &enriched[0].insights;
        assert_eq!(insights.reach, 800);
        assert_eq!(insights.impressions, 950);
        assert_eq!(insights.saved, 6);
        assert!(!insights.reach_is_estimated);
        // Likes and comments fall back to the post's own counters.
        assert_eq!(insights.likes, 20);
        assert_eq!(insights.engagement, 28);
    }

    #[tokio::test]
    async fn test_plays_stand_in_for_missing_impressions() {
        let api = ScriptedApi::new(
            vec![Some(vec![
                MetricValue::new("reach", 1000),
                MetricValue::new("plays", 1400),
            ])],
            None,
        );
        let aggregator = InsightAggregator::new(api);

        let enriched = aggregator
            .enrich_posts(&account(), vec![post("r1", MediaType::Reel, 0, 0)])
            .await;

        assert_eq!(enriched[0].insights.impressions, 1400);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_is_capped_at_the_batch_size() {
        let api = CountingApi::new();
        let aggregator = InsightAggregator::new(api.clone());

        let posts = (0..12)
            .map(|i| post(&format!("p{i}"), MediaType::Image, 5, 0))
            .collect();
        let enriched = aggregator.enrich_posts(&account(), posts).await;

        assert_eq!(enriched.len(), 12);
        assert_eq!(api.calls.load(Ordering::SeqCst), 12);
        assert_eq!(api.max_in_flight.load(Ordering::SeqCst), BATCH_SIZE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_runs_between_batches_not_after_the_last() {
        let api = ScriptedApi::new(
            (0..12)
                .map(|_| Some(vec![MetricValue::new("reach", 10)]))
                .collect(),
            None,
        );
        let aggregator = InsightAggregator::new(api);

        // 12 posts make three batches, so exactly two pacing pauses.
        let start = tokio::time::Instant::now();
        let posts = (0..12)
            .map(|i| post(&format!("p{i}"), MediaType::Image, 5, 0))
            .collect();
        aggregator.enrich_posts(&account(), posts).await;
        let elapsed = start.elapsed();

        assert!(elapsed >= BATCH_PACING * 2, "elapsed {:?}", elapsed);
        assert!(elapsed < BATCH_PACING * 3, "elapsed {:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_batch_is_not_paced_at_all() {
        let api = ScriptedApi::new(
            (0..5)
                .map(|_| Some(vec![MetricValue::new("reach", 10)]))
                .collect(),
            None,
        );
        let aggregator = InsightAggregator::new(api);

        let start = tokio::time::Instant::now();
        let posts = (0..5)
            .map(|i| post(&format!("p{i}"), MediaType::Image, 5, 0))
            .collect();
        aggregator.enrich_posts(&account(), posts).await;

        assert!(start.elapsed() < BATCH_PACING);
    }

    #[tokio::test]
    async fn test_empty_post_list_makes_no_remote_calls() {
        let api = ScriptedApi::new(vec![], None);
        let aggregator = InsightAggregator::new(api.clone());

        let enriched = aggregator.enrich_posts(&account(), Vec::new()).await;

        assert!(enriched.is_empty());
        assert!(api.requested().is_empty());
        assert_eq!(api.follower_calls.load(Ordering::SeqCst), 0);
    }
}
