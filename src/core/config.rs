use crate::core::schedule::Frequency;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BinanceProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct YahooProviderConfig {
    /// Base URL of the search/history relay, e.g. `http://127.0.0.1:3001/api/yahoo`
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub binance: Option<BinanceProviderConfig>,
    pub yahoo: Option<YahooProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            binance: Some(BinanceProviderConfig {
                base_url: "https://api.binance.com".to_string(),
            }),
            yahoo: Some(YahooProviderConfig {
                base_url: "http://127.0.0.1:3001/api/yahoo".to_string(),
            }),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig { ttl_secs: 3600 }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct RelayConfig {
    pub listen: String,
    pub upstream: String,
    pub timeout_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        RelayConfig {
            listen: "127.0.0.1:3001".to_string(),
            upstream: "https://query1.finance.yahoo.com".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ScheduleDefaults {
    pub amount: f64,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
}

impl Default for ScheduleDefaults {
    fn default() -> Self {
        ScheduleDefaults {
            amount: 100.0,
            frequency: Frequency::Weekly,
            start_date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ComparisonConfig {
    pub assets: Vec<String>,
    pub debounce_ms: u64,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        ComparisonConfig {
            assets: vec!["BTC".to_string(), "Gold".to_string(), "Silver".to_string()],
            debounce_ms: 500,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_history_years() -> u32 {
    10
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub defaults: ScheduleDefaults,
    #[serde(default)]
    pub comparison: ComparisonConfig,
    /// Substitute synthetic prices when an upstream fetch fails.
    #[serde(default = "default_true")]
    pub fallback: bool,
    /// How far back external symbol histories are requested.
    #[serde(default = "default_history_years")]
    pub history_years: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            providers: ProvidersConfig::default(),
            cache: CacheConfig::default(),
            relay: RelayConfig::default(),
            defaults: ScheduleDefaults::default(),
            comparison: ComparisonConfig::default(),
            fallback: true,
            history_years: default_history_years(),
        }
    }
}

impl AppConfig {
    /// Loads the config from the default location, or built-in defaults when
    /// no file exists there yet.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "dcasim", "dcasim")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn binance_url(&self) -> &str {
        self.providers
            .binance
            .as_ref()
            .map_or("https://api.binance.com", |p| &p.base_url)
    }

    pub fn yahoo_url(&self) -> &str {
        self.providers
            .yahoo
            .as_ref()
            .map_or("http://127.0.0.1:3001/api/yahoo", |p| &p.base_url)
    }
}
