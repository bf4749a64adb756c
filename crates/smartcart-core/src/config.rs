//! Client configuration management.
//!
//! Configuration is stored at `~/.config/smartcart/config.json` and holds the
//! API base URL, the paired cart session (the datum the command guard checks
//! before cart operations), and the last login email.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "smartcart";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Default API base URL. Kiosk deployments front the backend at `/api` on
/// the local gateway host.
const DEFAULT_API_BASE_URL: &str = "https://localhost/api";

/// Environment variable overriding the configured API base URL.
const API_URL_ENV: &str = "SMARTCART_API_URL";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_base_url: Option<String>,
    pub cart_session_id: Option<i64>,
    pub last_email: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir =
            dirs::cache_dir().ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Effective API base URL: environment override, then config, then the
    /// deployment default.
    pub fn api_base_url(&self) -> String {
        std::env::var(API_URL_ENV)
            .ok()
            .or_else(|| self.api_base_url.clone())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
    }

    /// Whether this client is paired with a physical cart.
    pub fn is_paired(&self) -> bool {
        self.cart_session_id.is_some()
    }
}
