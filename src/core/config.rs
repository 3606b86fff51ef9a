use anyhow::{Context, Result, ensure};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

use crate::core::cache::StalePolicy;
use crate::core::rates::{CurrencyPair, DEFAULT_POLL_INTERVAL};
use crate::providers::er_api::DEFAULT_BASE_URL;

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ErApiProviderConfig {
    pub base_url: String,
}

impl Default for ErApiProviderConfig {
    fn default() -> Self {
        ErApiProviderConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub er_api: ErApiProviderConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct RefreshConfig {
    /// Minutes between scheduled revalidations of the cache.
    pub poll_interval_minutes: u64,
    /// Serve the last stored snapshot when a refresh fails.
    pub stale_fallback: bool,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        RefreshConfig {
            poll_interval_minutes: DEFAULT_POLL_INTERVAL.as_secs() / 60,
            stale_fallback: false,
        }
    }
}

impl RefreshConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_minutes.saturating_mul(60))
    }

    pub fn stale_policy(&self) -> StalePolicy {
        if self.stale_fallback {
            StalePolicy::ServeStale
        } else {
            StalePolicy::Propagate
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub default_pair: CurrencyPair,
    pub data_path: Option<String>,
}

impl AppConfig {
    /// Loads the config from the default location, or defaults when no file exists there.
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
        let proj_dirs = ProjectDirs::from("in", "codito", "fxconv")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("in", "codito", "fxconv")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config = Self::from_yaml(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document deserializes to null, which means "all defaults"
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        ensure!(
            config.refresh.poll_interval_minutes > 0,
            "refresh.poll_interval_minutes must be at least 1"
        );
        config.default_pair =
            CurrencyPair::new(&config.default_pair.from, &config.default_pair.to);
        Ok(config)
    }
}
