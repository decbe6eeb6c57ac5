use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::metrics::PostInsights;

/// Content type of a post, normalized from the Graph API's `media_type` and
/// `media_product_type` fields. The insights endpoint accepts different
/// metric sets per type, so this drives the fallback cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Image,
    Video,
    Carousel,
    Reel,
}

impl MediaType {
    /// Collapse the API's two type fields into a single tag. Reels are
    /// flagged via `media_product_type`, not `media_type`.
    pub fn from_api(media_type: &str, media_product_type: Option<&str>) -> Self {
        if media_product_type.is_some_and(|p| p.eq_ignore_ascii_case("REELS")) {
            return MediaType::Reel;
        }
        match media_type.to_ascii_uppercase().as_str() {
            "VIDEO" => MediaType::Video,
            "CAROUSEL_ALBUM" => MediaType::Carousel,
            // Unknown types get the image treatment, the least demanding metric sets.
            _ => MediaType::Image,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
            MediaType::Carousel => "carousel",
            MediaType::Reel => "reel",
        }
    }
}

/// A post as listed by the media endpoint, before any insights are attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPost {
    pub id: String,
    pub media_type: MediaType,
    pub caption: Option<String>,
    pub permalink: Option<String>,
    pub media_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub like_count: i64,
    pub comments_count: i64,
}

/// A fully enriched post, ready to cache and serve. This is the shape that
/// round-trips through the snapshot column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostSnapshot {
    pub post_id: String,
    pub media_type: MediaType,
    pub caption: Option<String>,
    pub permalink: Option<String>,
    pub media_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
    pub like_count: i64,
    pub comments_count: i64,
    pub insights: PostInsights,
}

/// A post row as read back from the cache.
#[derive(Debug, Clone)]
pub struct CachedPost {
    pub account_id: i64,
    pub post_id: String,
    pub snapshot: PostSnapshot,
    /// When this generation of posts was fetched.
    pub last_updated: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_from_api() {
        assert_eq!(MediaType::from_api("IMAGE", None), MediaType::Image);
        assert_eq!(MediaType::from_api("VIDEO", Some("FEED")), MediaType::Video);
        assert_eq!(MediaType::from_api("CAROUSEL_ALBUM", None), MediaType::Carousel);
        assert_eq!(MediaType::from_api("VIDEO", Some("REELS")), MediaType::Reel);
    }

    #[test]
    fn test_reels_product_type_wins_over_media_type() {
        // The API reports reels as plain VIDEO in media_type.
        assert_eq!(MediaType::from_api("IMAGE", Some("reels")), MediaType::Reel);
    }

    #[test]
    fn test_unknown_media_type_falls_back_to_image() {
        assert_eq!(MediaType::from_api("STORY", None), MediaType::Image);
        assert_eq!(MediaType::from_api("", None), MediaType::Image);
    }
}
