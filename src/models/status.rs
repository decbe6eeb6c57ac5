use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of the most recent sync attempt for an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    InProgress,
    Completed,
    Failed,
}

impl SyncState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncState::InProgress => "in_progress",
            SyncState::Completed => "completed",
            SyncState::Failed => "failed",
        }
    }

    /// Unrecognized values read as failed so a corrupt row can never make
    /// an account look healthy or permanently in progress.
    pub fn from_db(value: &str) -> Self {
        match value {
            "in_progress" => SyncState::InProgress,
            "completed" => SyncState::Completed,
            _ => SyncState::Failed,
        }
    }
}

/// The single status row kept per account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncStatus {
    pub account_id: i64,
    pub state: SyncState,
    /// Advances only when a sync runs to completion.
    pub last_full_sync: Option<DateTime<Utc>>,
    pub posts_count: i64,
    pub error_message: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Partial status update. Absent fields keep whatever the row already holds,
/// except the error message which always reflects the latest attempt.
#[derive(Debug, Clone)]
pub struct StatusPatch {
    pub state: SyncState,
    pub last_full_sync: Option<DateTime<Utc>>,
    pub posts_count: Option<i64>,
    pub error_message: Option<String>,
}

impl StatusPatch {
    pub fn in_progress() -> Self {
        Self {
            state: SyncState::InProgress,
            last_full_sync: None,
            posts_count: None,
            error_message: None,
        }
    }

    pub fn completed(posts_count: i64, finished_at: DateTime<Utc>) -> Self {
        Self {
            state: SyncState::Completed,
            last_full_sync: Some(finished_at),
            posts_count: Some(posts_count),
            error_message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            state: SyncState::Failed,
            last_full_sync: None,
            posts_count: None,
            error_message: Some(message.into()),
        }
    }
}
