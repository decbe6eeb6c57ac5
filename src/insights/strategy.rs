use crate::models::MediaType;

// The insights endpoint rejects the entire request when any requested metric
// is unsupported for the post, which varies by content type, API version and
// post age. Each type therefore gets an ordered list of metric sets, richest
// first, and callers walk the list until one is accepted.

const REEL_METRIC_SETS: &[&[&str]] = &[
    &["reach", "plays", "likes", "comments", "saved", "shares", "total_interactions"],
    &["reach", "likes", "comments", "saved", "shares"],
    &["reach", "total_interactions"],
    &["reach"],
];

const VIDEO_METRIC_SETS: &[&[&str]] = &[
    &["reach", "impressions", "video_views", "saved", "shares", "likes", "comments"],
    &["reach", "impressions", "video_views", "saved"],
    &["reach", "impressions"],
    &["impressions"],
];

const CAROUSEL_METRIC_SETS: &[&[&str]] = &[
    &["reach", "impressions", "saved", "shares", "likes", "comments", "total_interactions"],
    &["reach", "impressions", "saved"],
    &["carousel_album_reach", "carousel_album_impressions", "carousel_album_saved"],
    &["impressions"],
];

const IMAGE_METRIC_SETS: &[&[&str]] = &[
    &["reach", "impressions", "saved", "shares", "likes", "comments"],
    &["reach", "impressions", "saved"],
    &["reach", "impressions"],
    &["impressions"],
];

/// Ordered fallback metric sets for one content type, most complete first.
/// The table is fixed at compile time, so resolution for a given type is
/// always the same cascade.
pub fn metric_sets(media_type: MediaType) -> &'static [&'static [&'static str]] {
    match media_type {
        MediaType::Reel => REEL_METRIC_SETS,
        MediaType::Video => VIDEO_METRIC_SETS,
        MediaType::Carousel => CAROUSEL_METRIC_SETS,
        MediaType::Image => IMAGE_METRIC_SETS,
    }
}
