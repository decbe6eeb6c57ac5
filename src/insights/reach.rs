// Older posts and some content types never get a reach figure out of the
// API. Rather than render holes, reach is estimated from the like count at
// a typical engagement ratio. Values derived here are flagged as estimates
// all the way to the consumer.

/// Assumed likes-to-reach ratio: roughly 2% of reached users leave a like.
const ASSUMED_ENGAGEMENT_RATE: f64 = 0.02;
/// An estimate above this multiple of the follower count is implausible.
const PLAUSIBILITY_CEILING: f64 = 1.5;
/// Implausible estimates are clamped to this share of the audience.
const CLAMP_RATIO: f64 = 0.3;

/// Estimate how many users a post reached from its like count. Zero likes
/// estimate to zero reach, never to a phantom audience.
pub fn estimate_reach(like_count: i64, follower_count: Option<i64>) -> i64 {
    if like_count <= 0 {
        return 0;
    }

    let estimate = (like_count as f64 / ASSUMED_ENGAGEMENT_RATE).round();

    if let Some(followers) = follower_count {
        if estimate > followers as f64 * PLAUSIBILITY_CEILING {
            return (followers as f64 * CLAMP_RATIO).round() as i64;
        }
    }

    estimate as i64
}
