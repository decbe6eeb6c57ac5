use serde::{Deserialize, Serialize};

use super::metrics::round2;
use super::post::PostSnapshot;

/// Aggregate engagement figures for a served post set. Always computed from
/// the snapshots being returned, so cached and freshly synced responses can
/// never disagree about their own totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub posts_count: usize,
    pub total_likes: i64,
    pub total_comments: i64,
    pub total_engagement: i64,
    pub total_reach: i64,
    pub avg_engagement_rate: f64,
    /// How many posts carry estimated rather than measured reach.
    pub estimated_reach_posts: usize,
}

impl AccountSummary {
    pub fn from_posts<'a, I>(posts: I) -> Self
    where
        I: IntoIterator<Item = &'a PostSnapshot>,
    {
        let mut summary = AccountSummary::default();
        let mut rate_sum = 0.0;

        for post in posts {
            summary.posts_count += 1;
            summary.total_likes += post.insights.likes;
            summary.total_comments += post.insights.comments;
            summary.total_engagement += post.insights.engagement;
            summary.total_reach += post.insights.reach;
            rate_sum += post.insights.engagement_rate;
            if post.insights.reach_is_estimated {
                summary.estimated_reach_posts += 1;
            }
        }

        if summary.posts_count > 0 {
            summary.avg_engagement_rate = round2(rate_sum / summary.posts_count as f64);
        }

        summary
    }
}
