//! Application configuration management.
//!
//! Configuration is stored at `~/.config/albtour/config.json`. Every field
//! has a default, so a missing file (or a partial one) is fine. The
//! `ALBTOUR_API_URL` and `ALBTOUR_LANGUAGE` environment variables override
//! the file.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;
use tracing::warn;

use crate::models::Language;

/// Application name used for config directory paths
const APP_NAME: &str = "albtour";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DEFAULT_API_BASE_URL: &str = "https://tea2.base.al/api";

const DEFAULT_EXCHANGE_RATES_URL: &str =
    "https://cdn.jsdelivr.net/npm/@fawazahmed0/currency-api@latest/v1/currencies/all.json";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub exchange_rates_url: String,
    pub request_timeout_secs: u64,
    /// TTL for general cache entries
    pub cache_ttl_minutes: u64,
    /// Interval of the background sweep that evicts expired entries
    pub sweep_interval_minutes: u64,
    pub language: Language,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            exchange_rates_url: DEFAULT_EXCHANGE_RATES_URL.to_string(),
            request_timeout_secs: 30,
            cache_ttl_minutes: 3 * 60,
            sweep_interval_minutes: 30,
            language: Language::En,
        }
    }
}

impl Config {
    /// Load the config file (if any) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            Self::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("ALBTOUR_API_URL").filter(|u| !u.trim().is_empty()) {
            self.api_base_url = url;
        }
        if let Some(code) = lookup("ALBTOUR_LANGUAGE") {
            match Language::from_code(&code) {
                Some(lang) => self.language = lang,
                None => warn!(code = %code, "Ignoring unknown ALBTOUR_LANGUAGE"),
            }
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_minutes * 60)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_minutes.max(1) * 60)
    }
}
