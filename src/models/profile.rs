use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account profile as returned by the Graph API. Deserialized straight off
/// the wire and stored as an opaque snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    pub username: String,
    pub name: Option<String>,
    pub biography: Option<String>,
    #[serde(default)]
    pub followers_count: i64,
    #[serde(default)]
    pub follows_count: i64,
    #[serde(default)]
    pub media_count: i64,
    pub profile_picture_url: Option<String>,
}

/// A profile row as read back from the cache.
#[derive(Debug, Clone)]
pub struct CachedProfile {
    pub account_id: i64,
    pub snapshot: ProfileSnapshot,
    pub last_updated: DateTime<Utc>,
}
