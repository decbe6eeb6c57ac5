use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::{
    CachedPost, CachedProfile, PostSnapshot, ProfileSnapshot, StatusPatch, SyncState, SyncStatus,
};

use super::schema::SCHEMA;

#[derive(Clone)]
pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;

        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    pub async fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;

        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    // Profile cache

    pub async fn save_profile(
        &self,
        account_id: i64,
        snapshot: &ProfileSnapshot,
        fetched_at: DateTime<Utc>,
    ) -> Result<()> {
        let snapshot_json = serde_json::to_string(snapshot)?;
        let fetched_at = fetched_at.to_rfc3339();
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO cached_profiles (account_id, snapshot, last_updated)
                       VALUES (?1, ?2, ?3)
                       ON CONFLICT(account_id) DO UPDATE SET
                           snapshot = excluded.snapshot,
                           last_updated = excluded.last_updated"#,
                    params![account_id, snapshot_json, fetched_at],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn get_profile(&self, account_id: i64) -> Result<Option<CachedProfile>> {
        let row = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT account_id, snapshot, last_updated FROM cached_profiles WHERE account_id = ?1",
                )?;
                let row = stmt
                    .query_row(params![account_id], |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                        ))
                    })
                    .optional()?;
                Ok(row)
            })
            .await?;

        let Some((account_id, snapshot_json, last_updated)) = row else {
            return Ok(None);
        };
        Ok(Some(CachedProfile {
            account_id,
            snapshot: serde_json::from_str(&snapshot_json)?,
            last_updated: read_timestamp(&last_updated),
        }))
    }

    // Post cache

    /// Replaces the account's cached posts with a new generation. The delete
    /// commits on its own, so a failed insert leaves the account with zero
    /// cached posts rather than a mix of generations.
    pub async fn replace_posts(
        &self,
        account_id: i64,
        posts: &[PostSnapshot],
        fetched_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut rows = Vec::with_capacity(posts.len());
        for post in posts {
            rows.push((post.post_id.clone(), serde_json::to_string(post)?));
        }
        let fetched_at = fetched_at.to_rfc3339();

        self.conn
            .call(move |conn| {
                conn.execute(
                    "DELETE FROM cached_posts WHERE account_id = ?1",
                    params![account_id],
                )?;
                let tx = conn.transaction()?;
                for (post_id, snapshot_json) in &rows {
                    tx.execute(
                        r#"INSERT INTO cached_posts (account_id, post_id, snapshot, last_updated)
                           VALUES (?1, ?2, ?3, ?4)
                           ON CONFLICT(account_id, post_id) DO UPDATE SET
                               snapshot = excluded.snapshot,
                               last_updated = excluded.last_updated"#,
                        params![account_id, post_id, snapshot_json, fetched_at],
                    )?;
                }
                tx.commit()?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn get_posts(&self, account_id: i64) -> Result<Vec<CachedPost>> {
        let rows = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT account_id, post_id, snapshot, last_updated FROM cached_posts WHERE account_id = ?1 ORDER BY id",
                )?;
                let rows = stmt
                    .query_map(params![account_id], |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                        ))
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;

        let mut posts = Vec::with_capacity(rows.len());
        for (account_id, post_id, snapshot_json, last_updated) in rows {
            posts.push(CachedPost {
                account_id,
                post_id,
                snapshot: serde_json::from_str(&snapshot_json)?,
                last_updated: read_timestamp(&last_updated),
            });
        }
        Ok(posts)
    }

    // Sync status

    pub async fn get_status(&self, account_id: i64) -> Result<Option<SyncStatus>> {
        let status = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT account_id, sync_state, last_full_sync, posts_count, error_message, updated_at
                     FROM sync_status WHERE account_id = ?1",
                )?;
                let status = stmt
                    .query_row(params![account_id], |row| Ok(status_from_row(row)))
                    .optional()?;
                Ok(status)
            })
            .await?;
        Ok(status)
    }

    pub async fn upsert_status(&self, account_id: i64, patch: StatusPatch) -> Result<()> {
        let state = patch.state.as_str();
        let last_full_sync = patch.last_full_sync.map(|dt| dt.to_rfc3339());
        let updated_at = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO sync_status (account_id, sync_state, last_full_sync, posts_count, error_message, updated_at)
                       VALUES (?1, ?2, ?3, COALESCE(?4, 0), ?5, ?6)
                       ON CONFLICT(account_id) DO UPDATE SET
                           sync_state = excluded.sync_state,
                           last_full_sync = COALESCE(excluded.last_full_sync, sync_status.last_full_sync),
                           posts_count = COALESCE(?4, sync_status.posts_count),
                           error_message = excluded.error_message,
                           updated_at = excluded.updated_at"#,
                    params![
                        account_id,
                        state,
                        last_full_sync,
                        patch.posts_count,
                        patch.error_message,
                        updated_at,
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Collapses duplicate status rows down to the newest one. Databases
    /// written before the unique index existed can hold several rows per
    /// account, which would make every status read ambiguous.
    pub async fn dedupe_status(&self, account_id: i64) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"DELETE FROM sync_status
                       WHERE account_id = ?1
                         AND id NOT IN (SELECT MAX(id) FROM sync_status WHERE account_id = ?1)"#,
                    params![account_id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    // Maintenance

    pub async fn clear(&self, account_id: i64) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "DELETE FROM cached_posts WHERE account_id = ?1",
                    params![account_id],
                )?;
                conn.execute(
                    "DELETE FROM cached_profiles WHERE account_id = ?1",
                    params![account_id],
                )?;
                conn.execute(
                    "DELETE FROM sync_status WHERE account_id = ?1",
                    params![account_id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Deletes cached posts and profiles last updated before the cutoff.
    /// Status rows are spared; losing them would reset cooldown tracking
    /// and invite a refetch stampede.
    pub async fn delete_expired_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let cutoff = cutoff.to_rfc3339();
        let deleted = self
            .conn
            .call(move |conn| {
                let posts = conn.execute(
                    "DELETE FROM cached_posts WHERE last_updated < ?1",
                    params![cutoff],
                )?;
                let profiles = conn.execute(
                    "DELETE FROM cached_profiles WHERE last_updated < ?1",
                    params![cutoff],
                )?;
                Ok((posts + profiles) as u64)
            })
            .await?;
        Ok(deleted)
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // Try RFC3339 first (e.g., "2026-01-11T12:34:56+00:00")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Try SQLite datetime format (e.g., "2026-01-11 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

/// Unparseable timestamps read as the epoch, maximally stale, so freshness
/// checks err toward refetching instead of trusting bad data.
fn read_timestamp(s: &str) -> DateTime<Utc> {
    parse_datetime(s).unwrap_or(DateTime::UNIX_EPOCH)
}

fn status_from_row(row: &Row) -> SyncStatus {
    SyncStatus {
        account_id: row.get(0).unwrap(),
        state: SyncState::from_db(&row.get::<_, String>(1).unwrap()),
        last_full_sync: row
            .get::<_, Option<String>>(2)
            .unwrap()
            .and_then(|s| parse_datetime(&s)),
        posts_count: row.get(3).unwrap(),
        error_message: row.get(4).unwrap(),
        updated_at: row
            .get::<_, String>(5)
            .ok()
            .map(|s| read_timestamp(&s))
            .unwrap_or(DateTime::UNIX_EPOCH),
    }
}
