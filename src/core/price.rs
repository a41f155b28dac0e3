//! Price series abstractions and asset identifiers

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

/// A single daily closing price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub day: NaiveDate,
    pub price: f64,
}

impl PricePoint {
    pub fn new(day: NaiveDate, price: f64) -> Self {
        Self { day, price }
    }
}

/// The fixed set of assets with a built-in fetch route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum StandardAsset {
    Bitcoin,
    Gold,
    Silver,
}

impl StandardAsset {
    pub fn key(&self) -> &'static str {
        match self {
            StandardAsset::Bitcoin => "BTC",
            StandardAsset::Gold => "Gold",
            StandardAsset::Silver => "Silver",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StandardAsset::Bitcoin => "Bitcoin",
            StandardAsset::Gold => "Gold",
            StandardAsset::Silver => "Silver",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            StandardAsset::Bitcoin => "BTC",
            StandardAsset::Gold | StandardAsset::Silver => "oz",
        }
    }

    /// Symbol understood by the upstream feed for this asset.
    pub fn upstream_symbol(&self) -> &'static str {
        match self {
            StandardAsset::Bitcoin => "BTCUSDT",
            StandardAsset::Gold => "GC=F",
            StandardAsset::Silver => "SI=F",
        }
    }
}

/// Identifies an asset to fetch and simulate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum AssetId {
    Standard(StandardAsset),
    ExternalSymbol(String),
}

impl AssetId {
    pub fn external(ticker: &str) -> Self {
        AssetId::ExternalSymbol(ticker.trim().to_uppercase())
    }

    pub fn label(&self) -> &str {
        match self {
            AssetId::Standard(asset) => asset.label(),
            AssetId::ExternalSymbol(ticker) => ticker,
        }
    }

    /// Display unit for holdings of this asset.
    pub fn unit(&self) -> &str {
        match self {
            AssetId::Standard(asset) => asset.unit(),
            AssetId::ExternalSymbol(_) => "shares",
        }
    }
}

impl Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetId::Standard(asset) => write!(f, "{}", asset.key()),
            AssetId::ExternalSymbol(ticker) => write!(f, "{ticker}"),
        }
    }
}

impl FromStr for AssetId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(anyhow!("Asset identifier must not be empty"));
        }
        match trimmed.to_uppercase().as_str() {
            "BTC" | "BITCOIN" => Ok(AssetId::Standard(StandardAsset::Bitcoin)),
            "GOLD" => Ok(AssetId::Standard(StandardAsset::Gold)),
            "SILVER" => Ok(AssetId::Standard(StandardAsset::Silver)),
            _ => Ok(AssetId::external(trimmed)),
        }
    }
}

/// Builds an ordered, one-per-day series from raw `(epoch millis, close)` pairs.
///
/// Non-finite and non-positive closes are dropped. When several observations
/// fall on the same UTC day the last one wins.
pub fn normalize_closes<I>(raw: I) -> Vec<PricePoint>
where
    I: IntoIterator<Item = (i64, f64)>,
{
    let mut by_day = BTreeMap::new();
    for (timestamp_ms, close) in raw {
        if !close.is_finite() || close <= 0.0 {
            continue;
        }
        if let Some(dt) = DateTime::from_timestamp_millis(timestamp_ms) {
            by_day.insert(dt.date_naive(), close);
        }
    }
    by_day
        .into_iter()
        .map(|(day, price)| PricePoint::new(day, price))
        .collect()
}

/// One upstream feed able to return a daily close series for a symbol.
#[async_trait]
pub trait HistorySource: Send + Sync {
    async fn fetch_closes(&self, symbol: &str) -> Result<Vec<PricePoint>>;
}

#[async_trait]
pub trait PriceHistoryProvider: Send + Sync {
    async fn fetch_history(&self, asset: &AssetId) -> Result<Vec<PricePoint>>;
}
