use serde::{Deserialize, Serialize};

/// One metric returned by the insights endpoint, flattened out of the API's
/// nested value envelopes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricValue {
    pub name: String,
    pub value: i64,
}

impl MetricValue {
    pub fn new(name: impl Into<String>, value: i64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Per-post engagement metrics, either measured by the API or derived
/// locally when the API withheld them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostInsights {
    pub reach: i64,
    pub impressions: i64,
    pub saved: i64,
    pub shares: i64,
    pub likes: i64,
    pub comments: i64,
    /// Only present when the API reported it directly.
    pub total_interactions: Option<i64>,
    pub engagement: i64,
    /// Engagement as a percentage of reach, rounded to two decimals.
    pub engagement_rate: f64,
    /// True when reach came from the like-count heuristic rather than the API.
    #[serde(default)]
    pub reach_is_estimated: bool,
}

/// Engagement as a percentage of reach. Zero reach yields a zero rate,
/// never a division error.
pub fn engagement_rate_percent(engagement: i64, reach: i64) -> f64 {
    if reach <= 0 {
        return 0.0;
    }
    round2(engagement as f64 / reach as f64 * 100.0)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
