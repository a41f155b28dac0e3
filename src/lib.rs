pub mod cli;
pub mod core;
pub mod providers;
pub mod relay;
pub mod store;

use crate::core::config::AppConfig;
use crate::core::{AssetId, Comparison, Frequency, PriceHistoryProvider, PricePoint, ScheduleParameters};
use crate::providers::HistoryProvider;
use crate::providers::binance::BinanceSource;
use crate::providers::yahoo_finance::YahooRelaySource;
use crate::relay::RelayServer;
use crate::store::memory::MemoryCache;
use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Schedule overrides; anything left `None` comes from the config defaults.
#[derive(Debug, Clone, Default)]
pub struct ScheduleArgs {
    pub amount: Option<f64>,
    pub frequency: Option<Frequency>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl ScheduleArgs {
    fn resolve(&self, config: &AppConfig) -> Result<ScheduleParameters> {
        ScheduleParameters::new(
            self.amount.unwrap_or(config.defaults.amount),
            self.frequency.unwrap_or(config.defaults.frequency),
            self.start.unwrap_or(config.defaults.start_date),
            self.end.unwrap_or_else(|| Utc::now().date_naive()),
        )
    }
}

#[derive(Debug, Clone)]
pub enum AppCommand {
    Simulate {
        asset: String,
        schedule: ScheduleArgs,
        show_transactions: bool,
    },
    /// An empty asset list compares the configured assets.
    Compare {
        assets: Vec<String>,
        schedule: ScheduleArgs,
    },
    Search {
        query: String,
    },
    Relay {
        listen: Option<String>,
    },
}

fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");
    Ok(config)
}

/// Wires the fetch strategies, the shared cache and the fallback policy.
pub fn build_history_provider(config: &AppConfig) -> Result<HistoryProvider> {
    let crypto = BinanceSource::new(config.binance_url())?;
    let chart = YahooRelaySource::new(config.yahoo_url(), config.history_years)?;
    let cache = MemoryCache::<AssetId, Vec<PricePoint>>::new(Duration::from_secs(
        config.cache.ttl_secs,
    ));

    Ok(
        HistoryProvider::new(Arc::new(crypto), Arc::new(chart), Arc::new(cache))
            .with_fallback(config.fallback),
    )
}

/// Builds a comparison over `assets`, or the configured list when empty,
/// debounced as configured.
pub fn build_comparison(
    config: &AppConfig,
    assets: Vec<String>,
    schedule: &ScheduleArgs,
) -> Result<Comparison> {
    let names = if assets.is_empty() {
        config.comparison.assets.clone()
    } else {
        assets
    };
    let ids = names
        .iter()
        .map(|name| {
            name.parse::<AssetId>()
                .with_context(|| format!("Invalid asset '{name}'"))
        })
        .collect::<Result<Vec<_>>>()?;
    let params = schedule.resolve(config)?;
    let provider: Arc<dyn PriceHistoryProvider> = Arc::new(build_history_provider(config)?);

    Ok(Comparison::new(
        provider,
        ids,
        params,
        Duration::from_millis(config.comparison.debounce_ms),
    ))
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let config = load_config(config_path)?;

    match command {
        AppCommand::Simulate {
            asset,
            schedule,
            show_transactions,
        } => {
            let asset: AssetId = asset.parse()?;
            let params = schedule.resolve(&config)?;
            let provider = build_history_provider(&config)?;
            cli::simulate::run(&provider, &asset, &params, show_transactions).await
        }
        AppCommand::Compare { assets, schedule } => {
            let comparison = build_comparison(&config, assets, &schedule)?;
            cli::compare::run(&comparison).await
        }
        AppCommand::Search { query } => {
            let source = YahooRelaySource::new(config.yahoo_url(), config.history_years)?;
            cli::search::run(&source, &query).await
        }
        AppCommand::Relay { listen } => {
            let addr = listen.unwrap_or_else(|| config.relay.listen.clone());
            info!(upstream = %config.relay.upstream, "Starting Yahoo relay");
            let server = RelayServer::new(
                &config.relay.upstream,
                Duration::from_secs(config.relay.timeout_secs),
            )?;
            server.serve(&addr).await
        }
    }
}
