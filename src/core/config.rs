use crate::core::price::Asset;
use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CoinGeckoConfig {
    #[serde(default = "default_coingecko_url")]
    pub base_url: String,
    #[serde(default)]
    pub retries: usize,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CoinGeckoConfig {
    fn default() -> Self {
        CoinGeckoConfig {
            base_url: default_coingecko_url(),
            retries: 0,
            retry_delay_ms: default_retry_delay_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub coingecko: CoinGeckoConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_assets")]
    pub assets: Vec<Asset>,
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_history_days")]
    pub history_days: u32,
    #[serde(default)]
    pub providers: ProvidersConfig,
    pub version_url: Option<String>,
    pub data_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            assets: default_assets(),
            refresh_interval_secs: default_refresh_interval_secs(),
            history_days: default_history_days(),
            providers: ProvidersConfig::default(),
            version_url: None,
            data_path: None,
        }
    }
}

fn default_assets() -> Vec<Asset> {
    vec![
        Asset::new("bitcoin", "BTC"),
        Asset::new("ethereum", "ETH"),
        Asset::new("dogecoin", "DOGE"),
    ]
}

fn default_refresh_interval_secs() -> u64 {
    20
}

fn default_history_days() -> u32 {
    1
}

fn default_coingecko_url() -> String {
    "https://api.coingecko.com/api/v3".to_string()
}

fn default_retry_delay_ms() -> u64 {
    500
}

fn default_timeout_secs() -> u64 {
    10
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("dev", "coinwatch", "coinwatch")
        .context("Could not determine project directories")
}

impl AppConfig {
    /// Loads the config from the default location, or defaults when no file exists.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        Ok(project_dirs()?.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        Ok(project_dirs()?.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.assets.is_empty() {
            bail!("At least one asset must be configured");
        }
        let mut seen = HashSet::new();
        for asset in &self.assets {
            if asset.id.trim().is_empty() {
                bail!("Asset ids must not be empty");
            }
            if !seen.insert(asset.id.as_str()) {
                bail!("Duplicate asset id: {}", asset.id);
            }
        }
        if self.refresh_interval_secs == 0 {
            bail!("refresh_interval_secs must be positive");
        }
        Ok(())
    }
}
