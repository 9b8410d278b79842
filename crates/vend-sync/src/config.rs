//! # Sync Configuration
//!
//! Configuration management for the importer.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Command-line flags (highest priority, applied by the CLI)          │
//! │                                                                         │
//! │  2. Environment Variables                                              │
//! │     VEND_ADDRESS=mystore                                               │
//! │     VEND_TOKEN=...                                                     │
//! │                                                                         │
//! │  3. TOML Config File                                                   │
//! │     ~/.config/vend-sync/vend-sync.toml (Linux)                         │
//! │     ~/Library/Application Support/vend-sync/vend-sync.toml (macOS)     │
//! │                                                                         │
//! │  4. Default Values (lowest priority)                                   │
//! │     all known classes, native upsert, ./vend.db                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [vend]
//! address = "mystore"
//! token = "..."
//! page_size = 200
//!
//! [database]
//! path = "vend.db"
//!
//! [import]
//! classes = ["Outlet", "Product", "RegisterSale"]
//! upsert_strategy = "native"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use vend_core::flatten::DEFAULT_MAX_DEPTH;
use vend_db::{DbConfig, UpsertStrategy};

use crate::error::{SyncError, SyncResult};
use crate::resource_class::ResourceClass;

// =============================================================================
// Vend API Settings
// =============================================================================

/// Connection settings for the Vend API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendSettings {
    /// Store domain prefix (`mystore` → `https://mystore.vendhq.com/api/`)
    /// or a full base URL.
    #[serde(default)]
    pub address: String,

    /// OAuth2 bearer token.
    #[serde(default)]
    pub token: Option<String>,

    /// Resources requested per page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Per-request timeout (seconds).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Retries for one page request. 0 disables retrying.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff duration (milliseconds) between retries.
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff duration (seconds) between retries.
    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,
}

fn default_page_size() -> u32 {
    200
}
fn default_timeout() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    5
}
fn default_initial_backoff() -> u64 {
    500
}
fn default_max_backoff() -> u64 {
    30
}

impl Default for VendSettings {
    fn default() -> Self {
        VendSettings {
            address: String::new(),
            token: None,
            page_size: default_page_size(),
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_secs: default_max_backoff(),
        }
    }
}

impl VendSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs)
    }
}

// =============================================================================
// Database Settings
// =============================================================================

/// Where imported tables are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite database file.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    /// Connection pool size.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("vend.db")
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseSettings {
    /// Builds the pool configuration for these settings.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.path.clone()).max_connections(self.max_connections)
    }
}

// =============================================================================
// Import Settings
// =============================================================================

/// What to import and how to write it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSettings {
    /// Classes imported when none are named on the command line.
    #[serde(default = "default_classes")]
    pub classes: Vec<ResourceClass>,

    /// Write primitive used for upserts.
    #[serde(default)]
    pub upsert_strategy: UpsertStrategy,

    /// Deepest nesting the flattener follows.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

fn default_classes() -> Vec<ResourceClass> {
    ResourceClass::all().to_vec()
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

impl Default for ImportSettings {
    fn default() -> Self {
        ImportSettings {
            classes: default_classes(),
            upsert_strategy: UpsertStrategy::default(),
            max_depth: default_max_depth(),
        }
    }
}

// =============================================================================
// Main Sync Configuration
// =============================================================================

/// Complete importer configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Vend API connection.
    #[serde(default)]
    pub vend: VendSettings,

    /// Destination database.
    #[serde(default)]
    pub database: DatabaseSettings,

    /// Import behaviour.
    #[serde(default)]
    pub import: ImportSettings,
}

impl SyncConfig {
    /// Creates a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (vend-sync.toml)
    /// 3. Environment variables
    ///
    /// Validation is left to the caller, so command-line flags can still
    /// fill in missing values.
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading sync config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load sync config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Sync config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if self.vend.address.trim().is_empty() {
            return Err(SyncError::InvalidConfig(
                "vend.address must name a store or a base URL".into(),
            ));
        }
        crate::client::base_url(&self.vend.address)?;

        if self.vend.token.as_deref().map_or(true, |t| t.trim().is_empty()) {
            return Err(SyncError::MissingToken);
        }

        if self.vend.page_size == 0 {
            return Err(SyncError::InvalidConfig(
                "page_size must be greater than 0".into(),
            ));
        }

        if self.import.max_depth == 0 {
            return Err(SyncError::InvalidConfig(
                "max_depth must be greater than 0".into(),
            ));
        }

        if self.database.max_connections == 0 {
            return Err(SyncError::InvalidConfig(
                "max_connections must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(address) = std::env::var("VEND_ADDRESS") {
            debug!(address = %address, "Overriding Vend address from environment");
            self.vend.address = address;
        }

        if let Ok(token) = std::env::var("VEND_TOKEN") {
            self.vend.token = Some(token);
        }

        if let Ok(path) = std::env::var("VEND_SYNC_DATABASE") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Ok(classes) = std::env::var("VEND_SYNC_CLASSES") {
            match parse_class_list(&classes) {
                Ok(parsed) if !parsed.is_empty() => self.import.classes = parsed,
                Ok(_) => {}
                Err(e) => warn!(classes = %classes, "Ignoring VEND_SYNC_CLASSES: {}", e),
            }
        }

        if let Ok(strategy) = std::env::var("VEND_SYNC_UPSERT_STRATEGY") {
            match strategy.parse() {
                Ok(parsed) => self.import.upsert_strategy = parsed,
                Err(e) => warn!(strategy = %strategy, "Unknown upsert strategy in environment: {}", e),
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "vend-sync")
            .map(|dirs| dirs.config_dir().join("vend-sync.toml"))
    }
}

/// Parses a comma separated class list (`Outlet, register_sales`).
pub fn parse_class_list(raw: &str) -> SyncResult<Vec<ResourceClass>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> SyncConfig {
        let mut config = SyncConfig::default();
        config.vend.address = "mystore".into();
        config.vend.token = Some("secret".into());
        config
    }

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();
        assert_eq!(config.vend.page_size, 200);
        assert_eq!(config.vend.max_retries, 5);
        assert_eq!(config.database.path, PathBuf::from("vend.db"));
        assert_eq!(config.import.classes.len(), 8);
        assert_eq!(config.import.upsert_strategy, UpsertStrategy::Native);
        assert_eq!(config.import.max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_config_validation() {
        assert!(valid().validate().is_ok());

        let mut config = valid();
        config.vend.address = " ".into();
        assert!(matches!(config.validate(), Err(SyncError::InvalidConfig(_))));

        let mut config = valid();
        config.vend.token = None;
        assert!(matches!(config.validate(), Err(SyncError::MissingToken)));

        let mut config = valid();
        config.vend.page_size = 0;
        assert!(config.validate().is_err());

        let mut config = valid();
        config.vend.address = "https://mystore.vendhq.com/api/".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: SyncConfig = toml::from_str(
            r#"
            [vend]
            address = "mystore"
            token = "abc"

            [import]
            classes = ["Outlet", "register_sales"]
            upsert_strategy = "check_then_write"
            "#,
        )
        .unwrap();

        assert_eq!(config.vend.timeout_secs, 30);
        assert_eq!(
            config.import.classes,
            vec![ResourceClass::Outlet, ResourceClass::RegisterSale]
        );
        assert_eq!(config.import.upsert_strategy, UpsertStrategy::CheckThenWrite);
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_unknown_class_in_toml_is_rejected() {
        let result: Result<SyncConfig, _> = toml::from_str(
            r#"
            [import]
            classes = ["Widget"]
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_class_list() {
        let classes = parse_class_list("Outlet, tax ,,RegisterSale").unwrap();
        assert_eq!(
            classes,
            vec![ResourceClass::Outlet, ResourceClass::Tax, ResourceClass::RegisterSale]
        );
        assert!(parse_class_list("Outlet,Widget").is_err());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let path = std::env::temp_dir()
            .join(format!("vend-sync-config-{}", std::process::id()))
            .join("vend-sync.toml");

        let mut config = valid();
        config.import.classes = vec![ResourceClass::Customer];
        config.save(Some(path.clone())).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[vend]"));
        assert!(contents.contains("[import]"));

        let loaded: SyncConfig = toml::from_str(&contents).unwrap();
        assert_eq!(loaded.import.classes, vec![ResourceClass::Customer]);
        assert_eq!(loaded.vend.address, "mystore");

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
