use std::sync::Arc;

use chrono::Utc;

use insight_sync::api::GraphApiClient;
use insight_sync::config::Config;
use insight_sync::db::Repository;
use insight_sync::error::{AppError, Result};
use insight_sync::models::{Account, SyncState};
use insight_sync::sync::{freshness, SyncEngine};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (only show warnings and errors by default)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();

    // Load configuration
    let config = Config::load()?;

    let repository = Repository::new(&config.db_path).await?;
    let api = Arc::new(GraphApiClient::new(config.api_base_url.clone()));
    let engine = SyncEngine::new(repository.clone(), api, config.post_limit);

    match args.get(1).map(String::as_str) {
        Some("--refresh") => refresh_all(&engine, &config).await,
        Some("--sync") => {
            let account = account_arg(&config, &args)?;
            sync_one(&engine, &account).await
        }
        Some("--status") => show_status(&engine, &repository, id_arg(&args)?).await,
        Some("--clear") => {
            let id = id_arg(&args)?;
            engine.clear_cache(id).await?;
            println!("Cleared cached data for account {}", id);
            Ok(())
        }
        Some("--prune") => prune(&repository).await,
        _ => {
            print_usage();
            Ok(())
        }
    }
}

fn id_arg(args: &[String]) -> Result<i64> {
    let raw = args
        .get(2)
        .ok_or_else(|| AppError::Config("Missing account id argument".to_string()))?;
    raw.parse()
        .map_err(|_| AppError::Config(format!("Invalid account id: {}", raw)))
}

fn account_arg(config: &Config, args: &[String]) -> Result<Account> {
    let id = id_arg(args)?;
    let account_config = config
        .account(id)
        .ok_or_else(|| AppError::Config(format!("No account with id {} in config", id)))?;
    Ok(account_config.to_account())
}

async fn refresh_all(engine: &SyncEngine, config: &Config) -> Result<()> {
    for account_config in &config.accounts {
        let account = account_config.to_account();
        let data = engine.get_data_with_cache(&account, false).await;

        let state = data
            .status
            .as_ref()
            .map(|s| s.state.as_str())
            .unwrap_or("unknown");
        let source = if data.from_cache { "cache" } else { "remote" };
        println!(
            "{}: {} posts, {:.2}% avg engagement ({}, {})",
            account_config.display_name(),
            data.posts.len(),
            data.summary.avg_engagement_rate,
            state,
            source
        );
    }
    println!("Refreshed {} accounts", config.accounts.len());
    Ok(())
}

async fn sync_one(engine: &SyncEngine, account: &Account) -> Result<()> {
    let data = engine.get_data_with_cache(account, true).await;

    match &data.status {
        Some(status) if status.state == SyncState::Failed => {
            println!(
                "Sync failed for account {}: {}",
                account.id,
                status.error_message.as_deref().unwrap_or("unknown error")
            );
        }
        _ => {
            println!(
                "Synced account {}: {} posts, total engagement {}",
                account.id,
                data.posts.len(),
                data.summary.total_engagement
            );
            if data.summary.estimated_reach_posts > 0 {
                println!(
                    "  ({} posts carry estimated reach)",
                    data.summary.estimated_reach_posts
                );
            }
        }
    }
    Ok(())
}

async fn show_status(engine: &SyncEngine, repository: &Repository, account_id: i64) -> Result<()> {
    match engine.get_cache_status(account_id).await {
        Some(status) => {
            println!("Account {}", account_id);
            println!("  state: {}", status.state.as_str());
            match status.last_full_sync {
                Some(t) => println!("  last full sync: {}", t.to_rfc3339()),
                None => println!("  last full sync: never"),
            }
            println!("  posts: {}", status.posts_count);
            if let Some(message) = &status.error_message {
                println!("  error: {}", message);
            }
        }
        None => println!("Account {}: no sync status", account_id),
    }

    let now = Utc::now();
    if let Some(profile) = repository.get_profile(account_id).await? {
        let verdict = if freshness::is_valid(profile.last_updated, now) {
            "fresh"
        } else {
            "stale"
        };
        println!(
            "  profile cache: @{} from {} ({})",
            profile.snapshot.username,
            profile.last_updated.to_rfc3339(),
            verdict
        );
    }
    let posts = repository.get_posts(account_id).await?;
    if let Some(newest) = posts.iter().map(|p| p.last_updated).max() {
        let verdict = if freshness::is_valid(newest, now) {
            "fresh"
        } else {
            "stale"
        };
        println!(
            "  post cache: {} posts from {} ({})",
            posts.len(),
            newest.to_rfc3339(),
            verdict
        );
    }
    Ok(())
}

async fn prune(repository: &Repository) -> Result<()> {
    let cutoff = Utc::now() - freshness::expiry_window();
    let removed = repository.delete_expired_before(cutoff).await?;
    println!("Pruned {} expired cache entries", removed);
    Ok(())
}

fn print_usage() {
    println!("Usage: insight-sync [COMMAND]");
    println!();
    println!("Commands:");
    println!("  --refresh         Smart-sync every configured account");
    println!("  --sync <id>       Force a full sync for one account");
    println!("  --status <id>     Show sync status and cache freshness");
    println!("  --clear <id>      Drop all cached data for an account");
    println!("  --prune           Delete expired cache entries");
}
