//! Configuration management for pushroute.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::intent::DEFAULT_FRESHNESS_WINDOW_SECS;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "pushroute";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "navigation.db";

/// Target identifiers are opaque: anything non-empty is accepted.
const DEFAULT_TARGET_PATTERN: &str = r"(?s)^.+$";

/// Upper bound on the freshness window, in seconds.
const MAX_FRESHNESS_WINDOW_SECS: u64 = 24 * 60 * 60;

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `PUSHROUTE_`, sections split on `__`)
/// 2. TOML config file at `~/.config/pushroute/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Dispatcher configuration.
    pub dispatch: DispatchConfig,
    /// Inbound message configuration.
    pub message: MessageConfig,
    /// Navigation route configuration.
    pub route: RouteConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/pushroute/navigation.db`
    pub database_path: Option<PathBuf>,
}

/// Dispatcher-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Maximum age of a staged intent that may still navigate, in seconds.
    /// Applies to both slots.
    pub freshness_window_secs: u64,
    /// How long to wait for the navigation tree to become ready, in milliseconds.
    /// Set to 0 to wait indefinitely.
    pub ready_timeout_ms: u64,
}

/// Inbound message configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageConfig {
    /// Data field carrying the target identifier.
    pub target_field: String,
    /// Regex a target identifier must match. The default accepts any
    /// non-empty value; set a stricter pattern to reject unexpected ids.
    pub target_pattern: String,
}

/// Where a notification tap lands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteConfig {
    /// Navigators enclosing the destination, outermost first.
    pub parent_route: Vec<String>,
    /// Incident detail screen.
    pub destination_screen: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            freshness_window_secs: DEFAULT_FRESHNESS_WINDOW_SECS,
            ready_timeout_ms: 10_000,
        }
    }
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            target_field: "incidentId".to_string(),
            target_pattern: DEFAULT_TARGET_PATTERN.to_string(),
        }
    }
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            parent_route: vec!["UserTabs".to_string(), "Home".to_string()],
            destination_screen: "UserViewDetails".to_string(),
        }
    }
}

impl Config {
    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("PUSHROUTE_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.dispatch.freshness_window_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "freshness_window_secs must be greater than 0".to_string(),
            });
        }

        if self.dispatch.freshness_window_secs > MAX_FRESHNESS_WINDOW_SECS {
            return Err(Error::ConfigValidation {
                message: format!(
                    "freshness_window_secs ({}) cannot exceed {MAX_FRESHNESS_WINDOW_SECS}",
                    self.dispatch.freshness_window_secs
                ),
            });
        }

        if self.message.target_field.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "target_field cannot be empty".to_string(),
            });
        }

        if regex::Regex::new(&self.message.target_pattern).is_err() {
            return Err(Error::ConfigValidation {
                message: format!("invalid regex pattern: {}", self.message.target_pattern),
            });
        }

        if self.route.destination_screen.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "destination_screen cannot be empty".to_string(),
            });
        }

        if self.route.parent_route.iter().any(|name| name.trim().is_empty()) {
            return Err(Error::ConfigValidation {
                message: "parent_route cannot contain empty names".to_string(),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the freshness window as a `chrono` duration.
    #[must_use]
    pub fn freshness_window(&self) -> chrono::Duration {
        let secs = self
            .dispatch
            .freshness_window_secs
            .min(MAX_FRESHNESS_WINDOW_SECS);
        chrono::Duration::seconds(i64::try_from(secs).unwrap_or(0))
    }

    /// Get the readiness timeout, or `None` to wait indefinitely.
    #[must_use]
    pub fn ready_timeout(&self) -> Option<Duration> {
        if self.dispatch.ready_timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.dispatch.ready_timeout_ms))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.storage.database_path.is_none());
        assert_eq!(config.dispatch.freshness_window_secs, 300);
        assert_eq!(config.dispatch.ready_timeout_ms, 10_000);
        assert_eq!(config.message.target_field, "incidentId");
        assert_eq!(config.route.destination_screen, "UserViewDetails");
        assert_eq!(config.route.parent_route, vec!["UserTabs", "Home"]);
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_freshness_window() {
        let mut config = Config::default();
        config.dispatch.freshness_window_secs = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("freshness_window_secs"));
    }

    #[test]
    fn test_validate_huge_freshness_window() {
        let mut config = Config::default();
        config.dispatch.freshness_window_secs = u64::MAX;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("cannot exceed"));
    }

    #[test]
    fn test_validate_empty_target_field() {
        let mut config = Config::default();
        config.message.target_field = " ".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("target_field"));
    }

    #[test]
    fn test_validate_invalid_regex() {
        let mut config = Config::default();
        config.message.target_pattern = "[invalid".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("invalid regex"));
    }

    #[test]
    fn test_validate_empty_destination() {
        let mut config = Config::default();
        config.route.destination_screen = String::new();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("destination_screen"));
    }

    #[test]
    fn test_validate_empty_parent_route_entry() {
        let mut config = Config::default();
        config.route.parent_route = vec!["UserTabs".to_string(), String::new()];

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("parent_route"));
    }

    #[test]
    fn test_empty_parent_route_is_allowed() {
        let mut config = Config::default();
        config.route.parent_route.clear();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_pattern_accepts_opaque_ids() {
        let pattern = regex::Regex::new(&MessageConfig::default().target_pattern).unwrap();
        assert!(pattern.is_match("42"));
        assert!(pattern.is_match("665f1c2e9b1d4a0012ab34cd"));
        assert!(pattern.is_match("incident:42"));
        assert!(pattern.is_match("2025.07.25-7"));
        assert!(pattern.is_match("tenant/a b"));
        assert!(pattern.is_match("事件42"));
        assert!(pattern.is_match(&"x".repeat(129)));
        assert!(!pattern.is_match(""));
    }

    #[test]
    fn test_database_path_default() {
        let path = Config::default().database_path();
        assert!(path.to_string_lossy().contains("navigation.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/db.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/db.sqlite")
        );
    }

    #[test]
    fn test_freshness_window() {
        assert_eq!(
            Config::default().freshness_window(),
            chrono::Duration::minutes(5)
        );
    }

    #[test]
    fn test_ready_timeout() {
        let mut config = Config::default();
        assert_eq!(config.ready_timeout(), Some(Duration::from_secs(10)));

        config.dispatch.ready_timeout_ms = 0;
        assert!(config.ready_timeout().is_none());
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("pushroute"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_toml_file() {
        let path = std::env::temp_dir().join(format!("pushroute_config_{}.toml", std::process::id()));
        std::fs::write(
            &path,
            r#"
            [dispatch]
            freshness_window_secs = 60

            [route]
            parent_route = []
            destination_screen = "ReportDetailScreen"
            "#,
        )
        .unwrap();

        let config = Config::load_from(Some(path.clone())).unwrap();
        assert_eq!(config.dispatch.freshness_window_secs, 60);
        assert_eq!(config.dispatch.ready_timeout_ms, 10_000);
        assert!(config.route.parent_route.is_empty());
        assert_eq!(config.route.destination_screen, "ReportDetailScreen");

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let path = std::env::temp_dir().join(format!("pushroute_bad_{}.toml", std::process::id()));
        std::fs::write(&path, "[dispatch]\nfreshness_window_secs = 0\n").unwrap();

        let err = Config::load_from(Some(path.clone())).unwrap_err();
        assert!(matches!(err, Error::ConfigValidation { .. }));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_dispatch_config_deserialize() {
        let json = r#"{"freshness_window_secs": 120}"#;
        let dispatch: DispatchConfig = serde_json::from_str(json).unwrap();
        assert_eq!(dispatch.freshness_window_secs, 120);
        assert_eq!(dispatch.ready_timeout_ms, 10_000);
    }
}
