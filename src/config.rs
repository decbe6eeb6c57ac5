use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::api::DEFAULT_GRAPH_API_URL;
use crate::error::{AppError, Result};
use crate::models::Account;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// How many recent posts each sync pulls.
    #[serde(default = "default_post_limit")]
    pub post_limit: u32,

    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    pub id: i64,
    /// Display name for CLI output; falls back to the id.
    pub label: Option<String>,
    pub ig_user_id: String,
    pub access_token: String,
}

impl AccountConfig {
    pub fn to_account(&self) -> Account {
        Account {
            id: self.id,
            ig_user_id: self.ig_user_id.clone(),
            access_token: self.access_token.clone(),
        }
    }

    pub fn display_name(&self) -> String {
        self.label.clone().unwrap_or_else(|| self.id.to_string())
    }
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("insight-sync");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("cache.db").to_string_lossy().to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_GRAPH_API_URL.to_string()
}

fn default_post_limit() -> u32 {
    25
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            api_base_url: default_api_base_url(),
            post_limit: default_post_limit(),
            accounts: Vec::new(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("insight-sync")
            .join("config.toml")
    }

    pub fn account(&self, id: i64) -> Option<&AccountConfig> {
        self.accounts.iter().find(|a| a.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accounts_parse_from_toml() {
        let config: Config = toml::from_str(
            r#"
            db_path = "/tmp/insights.db"
            post_limit = 10

            [[accounts]]
            id = 1
            label = "brand"
            ig_user_id = "17841400000000000"
            access_token = "EAAG..."

            [[accounts]]
            id = 2
            ig_user_id = "17841400000000001"
            access_token = "EAAH..."
            "#,
        )
        .unwrap();

        assert_eq!(config.db_path, "/tmp/insights.db");
        assert_eq!(config.post_limit, 10);
        assert_eq!(config.api_base_url, DEFAULT_GRAPH_API_URL);
        assert_eq!(config.accounts.len(), 2);
        assert_eq!(config.account(1).unwrap().display_name(), "brand");
        assert_eq!(config.account(2).unwrap().display_name(), "2");
        assert!(config.account(3).is_none());
    }

    #[test]
    fn test_account_config_converts_to_account() {
        let account_config = AccountConfig {
            id: 7,
            label: None,
            ig_user_id: "178".to_string(),
            access_token: "tok".to_string(),
        };
        let account = account_config.to_account();
        assert_eq!(account.id, 7);
        assert_eq!(account.ig_user_id, "178");
    }
}
