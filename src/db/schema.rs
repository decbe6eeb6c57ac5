pub const SCHEMA: &str = r#"
-- cached_profiles table
CREATE TABLE IF NOT EXISTS cached_profiles (
    account_id INTEGER PRIMARY KEY,
    snapshot TEXT NOT NULL,
    last_updated TEXT NOT NULL
);

-- cached_posts table (one generation of posts per account, replaced wholesale)
CREATE TABLE IF NOT EXISTS cached_posts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    account_id INTEGER NOT NULL,
    post_id TEXT NOT NULL,
    snapshot TEXT NOT NULL,
    last_updated TEXT NOT NULL,
    UNIQUE(account_id, post_id)
);

CREATE INDEX IF NOT EXISTS idx_cached_posts_account_id ON cached_posts(account_id);
CREATE INDEX IF NOT EXISTS idx_cached_posts_last_updated ON cached_posts(last_updated);

-- sync_status table (one row per account; the surrogate id lets duplicate
-- rows from databases predating the unique index be aged out newest-wins)
CREATE TABLE IF NOT EXISTS sync_status (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    account_id INTEGER NOT NULL,
    sync_state TEXT NOT NULL,
    last_full_sync TEXT,
    posts_count INTEGER NOT NULL DEFAULT 0,
    error_message TEXT,
    updated_at TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_sync_status_account_id ON sync_status(account_id);
"#;
