use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::{MediaType, MetricValue, ProfileSnapshot, RawPost};

use super::AnalyticsApi;

pub const DEFAULT_GRAPH_API_URL: &str = "https://graph.facebook.com/v21.0";

const MEDIA_FIELDS: &str = "id,caption,media_type,media_product_type,media_url,permalink,thumbnail_url,timestamp,like_count,comments_count";
const PROFILE_FIELDS: &str =
    "username,name,biography,followers_count,follows_count,media_count,profile_picture_url";

#[derive(Debug, Deserialize)]
struct MediaListResponse {
    #[serde(default)]
    data: Vec<MediaNode>,
}

#[derive(Debug, Deserialize)]
struct MediaNode {
    id: String,
    caption: Option<String>,
    media_type: Option<String>,
    media_product_type: Option<String>,
    media_url: Option<String>,
    permalink: Option<String>,
    thumbnail_url: Option<String>,
    timestamp: Option<String>,
    like_count: Option<i64>,
    comments_count: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct InsightsResponse {
    #[serde(default)]
    data: Vec<InsightEntry>,
}

#[derive(Debug, Deserialize)]
struct InsightEntry {
    name: String,
    #[serde(default)]
    values: Vec<InsightPoint>,
    total_value: Option<TotalValue>,
}

// Metric values arrive as plain numbers for the metrics requested here, but
// the field is loosely typed on the wire, so non-numeric payloads are skipped
// instead of failing the whole response.
#[derive(Debug, Deserialize)]
struct InsightPoint {
    value: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TotalValue {
    value: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct FollowerCountNode {
    followers_count: Option<i64>,
}

pub struct GraphApiClient {
    client: Client,
    base_url: String,
}

impl GraphApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    async fn get_json<T>(&self, url: String, query: &[(&str, &str)]) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let response = self.client.get(&url).query(query).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(AppError::GraphApi(format!(
                "API error {}: {}",
                status, error_text
            )));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl AnalyticsApi for GraphApiClient {
    async fn list_posts(
        &self,
        ig_user_id: &str,
        access_token: &str,
        limit: u32,
    ) -> Result<Vec<RawPost>> {
        let url = format!("{}/{}/media", self.base_url, ig_user_id);
        let limit = limit.to_string();
        let response: MediaListResponse = self
            .get_json(
                url,
                &[
                    ("fields", MEDIA_FIELDS),
                    ("limit", limit.as_str()),
                    ("access_token", access_token),
                ],
            )
            .await?;

        Ok(response.data.into_iter().map(normalize_media).collect())
    }

    async fn get_account_profile(
        &self,
        ig_user_id: &str,
        access_token: &str,
    ) -> Result<ProfileSnapshot> {
        let url = format!("{}/{}", self.base_url, ig_user_id);
        self.get_json(
            url,
            &[("fields", PROFILE_FIELDS), ("access_token", access_token)],
        )
        .await
    }

    async fn get_post_insights(
        &self,
        media_id: &str,
        access_token: &str,
        metrics: &[&str],
    ) -> Result<Vec<MetricValue>> {
        let url = format!("{}/{}/insights", self.base_url, media_id);
        let metric = metrics.join(",");
        let response: InsightsResponse = self
            .get_json(
                url,
                &[("metric", metric.as_str()), ("access_token", access_token)],
            )
            .await?;

        Ok(flatten_insights(response))
    }

    async fn get_follower_count(
        &self,
        ig_user_id: &str,
        access_token: &str,
    ) -> Result<Option<i64>> {
        let url = format!("{}/{}", self.base_url, ig_user_id);
        let node: FollowerCountNode = self
            .get_json(
                url,
                &[("fields", "followers_count"), ("access_token", access_token)],
            )
            .await?;

        Ok(node.followers_count)
    }
}

fn normalize_media(node: MediaNode) -> RawPost {
    let media_type = MediaType::from_api(
        node.media_type.as_deref().unwrap_or(""),
        node.media_product_type.as_deref(),
    );
    RawPost {
        id: node.id,
        media_type,
        caption: node.caption,
        permalink: node.permalink,
        media_url: node.media_url,
        thumbnail_url: node.thumbnail_url,
        timestamp: node.timestamp.as_deref().and_then(parse_api_timestamp),
        like_count: node.like_count.unwrap_or(0),
        comments_count: node.comments_count.unwrap_or(0),
    }
}

/// Keep entries carrying a usable number, preferring the total_value
/// envelope newer API versions use over the per-period values list.
fn flatten_insights(response: InsightsResponse) -> Vec<MetricValue> {
    let mut metrics = Vec::with_capacity(response.data.len());
    for entry in response.data {
        let value = entry
            .total_value
            .and_then(|t| t.value)
            .and_then(|v| v.as_i64())
            .or_else(|| {
                entry
                    .values
                    .into_iter()
                    .find_map(|p| p.value.and_then(|v| v.as_i64()))
            });
        let Some(value) = value else {
            continue;
        };
        metrics.push(MetricValue {
            name: entry.name,
            value,
        });
    }
    metrics
}

fn parse_api_timestamp(s: &str) -> Option<DateTime<Utc>> {
    // The Graph API writes offsets without a colon (e.g., "2024-05-01T10:00:00+0000")
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    None
}
