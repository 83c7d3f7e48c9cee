//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.folio/config.json`) and
//! environment. Kept minimal: analytics credentials and the player entry page.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Analytics collector settings.
    #[serde(default)]
    pub analytics: AnalyticsConfig,

    /// Reader/player settings.
    #[serde(default)]
    pub reader: ReaderConfig,
}

/// Analytics collector settings (Segment-compatible track endpoint).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsConfig {
    /// When false, events go to the log only.
    #[serde(default = "default_analytics_enabled")]
    pub enabled: bool,

    /// Collector write key. Overridden by FOLIO_ANALYTICS_WRITE_KEY env. When
    /// absent, events go to the log only.
    pub write_key: Option<String>,

    /// Collector base URL (default https://api.segment.io).
    pub endpoint: Option<String>,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            enabled: default_analytics_enabled(),
            write_key: None,
            endpoint: None,
        }
    }
}

fn default_analytics_enabled() -> bool {
    true
}

/// Player settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReaderConfig {
    /// Path to the bundled player page the shell loads (e.g. player.htm).
    /// When unset, `folio open` only resolves and prints the book entry.
    pub player_entry: Option<PathBuf>,
}

/// Resolve the analytics write key: env FOLIO_ANALYTICS_WRITE_KEY overrides config.
pub fn resolve_write_key(config: &Config) -> Option<String> {
    std::env::var("FOLIO_ANALYTICS_WRITE_KEY")
        .ok()
        .and_then(|s| {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        })
        .or_else(|| {
            config
                .analytics
                .write_key
                .as_ref()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("FOLIO_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".folio").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the default path (or FOLIO_CONFIG_PATH). Missing file =>
/// default config. Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

/// Create the config directory and a default config file if they do not exist.
pub fn init_config_dir(config_path: &Path) -> Result<PathBuf> {
    let config_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(config_dir)
        .with_context(|| format!("creating config directory {}", config_dir.display()))?;
    if !config_path.exists() {
        std::fs::write(config_path, b"{}")
            .with_context(|| format!("writing default config to {}", config_path.display()))?;
        log::info!("created default config at {}", config_path.display());
    }
    Ok(config_dir.to_path_buf())
}
