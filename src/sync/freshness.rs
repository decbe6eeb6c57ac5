use chrono::{DateTime, Duration, Utc};

/// Cached data older than this no longer counts as fresh.
pub const EXPIRY_WINDOW_HOURS: i64 = 24;
/// Minimum gap between completed syncs for one account. Must stay well
/// under the expiry window or accounts would serve expired data forever.
pub const RESYNC_COOLDOWN_MINUTES: i64 = 30;

pub fn expiry_window() -> Duration {
    Duration::hours(EXPIRY_WINDOW_HOURS)
}

pub fn cooldown_window() -> Duration {
    Duration::minutes(RESYNC_COOLDOWN_MINUTES)
}

/// Whether a cache record written at `last_updated` is still trustworthy
/// at `now`.
pub fn is_valid(last_updated: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now.signed_duration_since(last_updated) < expiry_window()
}

/// Whether a completed sync ran recently enough that another one would be
/// wasteful. An account that never completed a sync is never throttled.
pub fn is_too_soon_to_resync(last_full_sync: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match last_full_sync {
        Some(last) => now.signed_duration_since(last) < cooldown_window(),
        None => false,
    }
}
