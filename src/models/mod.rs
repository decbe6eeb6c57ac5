mod account;
mod metrics;
mod post;
mod profile;
mod status;
mod summary;

pub use account::Account;
pub use metrics::{engagement_rate_percent, round2, MetricValue, PostInsights};
pub use post::{CachedPost, MediaType, PostSnapshot, RawPost};
pub use profile::{CachedProfile, ProfileSnapshot};
pub use status::{StatusPatch, SyncState, SyncStatus};
pub use summary::AccountSummary;
