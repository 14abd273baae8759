//! # Engine Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     STOCKBOOK_DB_PATH=/srv/shop/stockbook.db                           │
//! │     STOCKBOOK_STOCK_POLICY=reject                                      │
//! │     STOCKBOOK_BALANCE_POLICY=record_only                               │
//! │     STOCKBOOK_MAX_CONNECTIONS=4                                        │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/stockbook/stockbook.toml (Linux)                         │
//! │     ~/Library/Application Support/com.stockbook.stockbook/ (macOS)     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     allow_negative stock, symmetric balances, db in the data dir       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "/srv/shop/stockbook.db"
//! max_connections = 5
//!
//! [ledger]
//! stock = "allow_negative"   # allow_negative | reject
//! balance = "symmetric"      # symmetric | record_only | disabled
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};
use stockbook_core::{BalancePolicy, LedgerPolicy, StockPolicy};
use stockbook_db::DbConfig;

pub const ENV_DB_PATH: &str = "STOCKBOOK_DB_PATH";
pub const ENV_STOCK_POLICY: &str = "STOCKBOOK_STOCK_POLICY";
pub const ENV_BALANCE_POLICY: &str = "STOCKBOOK_BALANCE_POLICY";
pub const ENV_MAX_CONNECTIONS: &str = "STOCKBOOK_MAX_CONNECTIONS";

const DATABASE_FILE: &str = "stockbook.db";
const CONFIG_FILE: &str = "stockbook.toml";

// =============================================================================
// Database Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Defaults to `stockbook.db` in the platform data dir.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: default_max_connections(),
        }
    }
}

// =============================================================================
// Engine Configuration
// =============================================================================

/// Everything needed to open a store and build an engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub ledger: LedgerPolicy,
}

impl EngineConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`stockbook.toml`), if it exists
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    pub fn from_toml(contents: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Applies `STOCKBOOK_*` overrides read through `lookup`.
    ///
    /// An override that does not parse is an error rather than being
    /// skipped.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_DB_PATH) {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(value) = lookup(ENV_STOCK_POLICY) {
            self.ledger.stock = value
                .parse::<StockPolicy>()
                .map_err(|e| invalid(ENV_STOCK_POLICY, e))?;
            debug!(policy = %self.ledger.stock, "Overriding stock policy from environment");
        }

        if let Some(value) = lookup(ENV_BALANCE_POLICY) {
            self.ledger.balance = value
                .parse::<BalancePolicy>()
                .map_err(|e| invalid(ENV_BALANCE_POLICY, e))?;
            debug!(policy = %self.ledger.balance, "Overriding balance policy from environment");
        }

        if let Some(value) = lookup(ENV_MAX_CONNECTIONS) {
            self.database.max_connections = value
                .trim()
                .parse::<u32>()
                .map_err(|e| invalid(ENV_MAX_CONNECTIONS, e))?;
        }

        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                key: "database.max_connections".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    /// The database file to open: the configured path, else the platform
    /// data dir, else the working directory.
    pub fn database_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .or_else(Self::default_database_path)
            .unwrap_or_else(|| PathBuf::from(DATABASE_FILE))
    }

    pub fn to_db_config(&self) -> DbConfig {
        DbConfig::new(self.database_path()).max_connections(self.database.max_connections)
    }

    pub fn policy(&self) -> LedgerPolicy {
        self.ledger
    }

    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("com", "stockbook", "stockbook")
    }

    pub fn default_config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    pub fn default_database_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.data_dir().join(DATABASE_FILE))
    }
}

fn invalid(key: &str, reason: impl std::fmt::Display) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
