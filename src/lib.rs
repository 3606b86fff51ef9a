pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

pub use crate::core::config;

use crate::core::config::AppConfig;
use crate::core::{CurrencyPair, RateCache, RateFetcher};
use crate::store::{DiskStore, KeyValueStore, PairPreferences, RateStore};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

/// Subcommands that need the rate cache.
#[derive(Debug, Clone)]
pub enum AppCommand {
    Rates {
        base: String,
    },
    Convert {
        amount: f64,
        from: Option<String>,
        to: Option<String>,
        reverse: bool,
    },
    Watch {
        from: Option<String>,
        to: Option<String>,
    },
}

/// Wires the store, fetcher and cache described by the config.
struct App {
    config: AppConfig,
    cache: Arc<RateCache>,
    preferences: PairPreferences,
}

impl App {
    fn new(config: AppConfig) -> Result<Self> {
        let data_path = config.default_data_path()?.join("cache");
        let store: Arc<dyn KeyValueStore> = Arc::new(
            DiskStore::open(&data_path)
                .with_context(|| format!("Failed to open rate store at {}", data_path.display()))?,
        );
        let fetcher: Arc<dyn RateFetcher> = Arc::new(providers::ErApiProvider::new(
            &config.providers.er_api.base_url,
        )?);
        let cache = RateCache::new(RateStore::new(Arc::clone(&store)), fetcher)
            .with_policy(config.refresh.stale_policy());

        Ok(Self {
            preferences: PairPreferences::new(store),
            cache: Arc::new(cache),
            config,
        })
    }

    /// Saved pair (or the configured default), overridden by explicit codes.
    async fn resolve_pair(&self, from: Option<String>, to: Option<String>) -> Result<CurrencyPair> {
        let saved = self
            .preferences
            .load(&self.config.default_pair)
            .await
            .context("Failed to load saved currency pair")?;
        Ok(CurrencyPair::new(
            from.as_deref().unwrap_or(&saved.from),
            to.as_deref().unwrap_or(&saved.to),
        ))
    }
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("fxconv starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let app = App::new(config)?;

    match command {
        AppCommand::Rates { base } => cli::rates::run(&app.cache, &base.to_uppercase()).await,
        AppCommand::Convert {
            amount,
            from,
            to,
            reverse,
        } => {
            anyhow::ensure!(amount.is_finite(), "Amount must be a finite number");
            let request = cli::convert::ConvertRequest {
                amount,
                pair: app.resolve_pair(from, to).await?,
                reverse,
            };
            cli::convert::run(&app.cache, &app.preferences, &request).await
        }
        AppCommand::Watch { from, to } => {
            let pair = app.resolve_pair(from, to).await?;
            let interval = app.config.refresh.poll_interval();
            cli::watch::run(Arc::clone(&app.cache), pair, interval).await
        }
    }
}
