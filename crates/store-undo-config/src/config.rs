/// Application configuration: load, save, and sanitize.
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use store_undo_mod_history::HistoryConfig;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "STORE_UNDO_DATA_DIR";

/// Upper bound for a single `add`/`set` quantity.
const MAX_ITEM_COUNT_LIMIT: u32 = 9_999;

/// Top-level application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Name shown in the checkout summary.
    pub username: String,
    /// Product catalog JSON file. Empty = built-in catalog.
    pub products_path: String,
    /// Whether cart items survive restarts (stored in local storage).
    pub persist_cart: bool,
    /// Largest quantity accepted for one add/set action.
    pub max_item_count: u32,
    /// Directory holding the local storage database. Empty = resolved default.
    pub data_dir: String,
    /// Undo/redo settings for the cart.
    pub history: HistoryConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            username: "Guest".to_string(),
            products_path: String::new(),
            persist_cart: true,
            max_item_count: 99,
            data_dir: String::new(),
            history: HistoryConfig::default(),
        }
    }
}

impl AppConfig {
    /// Returns the config file path: exe directory + `store-undo.json`.
    pub fn config_path() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|d| d.join("store-undo.json")))
            .unwrap_or_else(|| PathBuf::from("store-undo.json"))
    }

    /// Loads config from `path`, creating a default file if it doesn't exist.
    /// Returns defaults on any error (missing file, parse error, etc.).
    pub fn load_or_create(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(contents) => match serde_json::from_str::<AppConfig>(&contents) {
                    Ok(mut config) => {
                        config.sanitize();
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {}: {e}", path.display());
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {}: {e}", path.display());
                }
            }
            // Return defaults on error (don't overwrite broken file)
            Self::default()
        } else {
            let config = Self::default();
            if let Err(e) = config.save(path) {
                tracing::warn!("Failed to create default config at {}: {e}", path.display());
            }
            config
        }
    }

    /// Saves config to `path` as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Clamps values to valid ranges and resets invalid fields.
    pub fn sanitize(&mut self) {
        let trimmed = self.username.trim();
        self.username = if trimmed.is_empty() {
            "Guest".to_string()
        } else {
            trimmed.to_string()
        };
        self.max_item_count = self.max_item_count.clamp(1, MAX_ITEM_COUNT_LIMIT);
        self.history.sanitize();
    }

    /// Product catalog path, if one is configured.
    pub fn products_file(&self) -> Option<PathBuf> {
        if self.products_path.trim().is_empty() {
            None
        } else {
            Some(PathBuf::from(self.products_path.trim()))
        }
    }

    /// Returns the effective data directory.
    ///
    /// Resolution order:
    /// 1. `data_dir` from the config file (if non-empty)
    /// 2. see [`resolve_data_dir`]
    pub fn resolve_data_dir(&self) -> PathBuf {
        if !self.data_dir.trim().is_empty() {
            return PathBuf::from(self.data_dir.trim());
        }
        resolve_data_dir()
    }
}

/// Resolves the default data directory.
///
/// Resolution order:
/// 1. `STORE_UNDO_DATA_DIR` environment variable
/// 2. `store-undo/` under the platform's local data directory
/// 3. `.data/` directory next to the executable
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }
    if let Some(dir) = dirs::data_local_dir() {
        return dir.join("store-undo");
    }
    let exe = std::env::current_exe().unwrap_or_else(|_| PathBuf::from("."));
    exe.parent().unwrap_or(Path::new(".")).join(".data")
}

#[cfg(test)]
mod tests {
    use super::*;
    use store_undo_mod_history::SnapshotFormat;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.username, "Guest");
        assert!(config.products_path.is_empty());
        assert!(config.persist_cart);
        assert_eq!(config.max_item_count, 99);
        assert!(config.history.enabled);
        assert_eq!(config.history.format, SnapshotFormat::Json);
    }

    #[test]
    fn test_sanitize_resets_blank_username() {
        let mut config = AppConfig {
            username: "   ".to_string(),
            ..Default::default()
        };
        config.sanitize();
        assert_eq!(config.username, "Guest");
    }

    #[test]
    fn test_sanitize_trims_username() {
        let mut config = AppConfig {
            username: "  dana ".to_string(),
            ..Default::default()
        };
        config.sanitize();
        assert_eq!(config.username, "dana");
    }

    #[test]
    fn test_sanitize_clamps_max_item_count() {
        let mut config = AppConfig {
            max_item_count: 0,
            ..Default::default()
        };
        config.sanitize();
        assert_eq!(config.max_item_count, 1);

        config.max_item_count = 1_000_000;
        config.sanitize();
        assert_eq!(config.max_item_count, 9_999);
    }

    #[test]
    fn test_sanitize_clamps_history_depth() {
        let mut config = AppConfig::default();
        config.history.max_depth = Some(0);
        config.sanitize();
        assert_eq!(config.history.max_depth, Some(1));
    }

    #[test]
    fn test_products_file() {
        let mut config = AppConfig::default();
        assert!(config.products_file().is_none());
        config.products_path = " catalog.json ".to_string();
        assert_eq!(config.products_file(), Some(PathBuf::from("catalog.json")));
    }

    #[test]
    fn test_configured_data_dir_wins() {
        let config = AppConfig {
            data_dir: "/srv/store".to_string(),
            ..Default::default()
        };
        assert_eq!(config.resolve_data_dir(), PathBuf::from("/srv/store"));
    }

    #[test]
    fn test_resolve_data_dir_with_env_var() {
        // Save and restore env var
        let original = std::env::var(DATA_DIR_ENV).ok();
        std::env::set_var(DATA_DIR_ENV, "/custom/path");
        let dir = resolve_data_dir();
        assert_eq!(dir, PathBuf::from("/custom/path"));
        // Restore
        match original {
            Some(val) => std::env::set_var(DATA_DIR_ENV, val),
            None => std::env::remove_var(DATA_DIR_ENV),
        }
    }

    #[test]
    fn test_serde_round_trip() {
        let mut config = AppConfig::default();
        config.username = "sam".to_string();
        config.history.format = SnapshotFormat::Bincode;
        config.history.max_depth = Some(25);
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_missing_fields_get_defaults() {
        let json = r#"{"username": "kai"}"#;
        let parsed: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.username, "kai");
        assert!(parsed.persist_cart);
        assert_eq!(parsed.history, HistoryConfig::default());
    }
}
