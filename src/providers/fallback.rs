//! Synthetic price histories used when no upstream data can be fetched.
use crate::core::price::{AssetId, PricePoint, StandardAsset};
use chrono::{Days, NaiveDate};

/// Length of the generated series, matching one full crypto kline window.
pub const FALLBACK_DAYS: u32 = 1000;

fn base_price(asset: &AssetId) -> f64 {
    match asset {
        AssetId::Standard(StandardAsset::Bitcoin) => 30_000.0,
        AssetId::Standard(StandardAsset::Gold) => 1_900.0,
        AssetId::Standard(StandardAsset::Silver) => 23.0,
        AssetId::ExternalSymbol(_) => 100.0,
    }
}

/// Phase offset so different assets do not move in lockstep.
fn phase(asset: &AssetId) -> f64 {
    let seed = match asset {
        AssetId::Standard(standard) => 7 * (*standard as u32 + 1),
        AssetId::ExternalSymbol(ticker) => ticker.bytes().map(u32::from).sum(),
    };
    f64::from(seed % 360).to_radians()
}

/// Generates one plausible close per calendar day, ending on `end_day`.
///
/// The output depends only on the arguments. Prices follow a gentle upward
/// drift with two superimposed cycles and never fall below 80% of the base.
pub fn synthetic_history(asset: &AssetId, end_day: NaiveDate, days: u32) -> Vec<PricePoint> {
    let base = base_price(asset);
    let phase = phase(asset);
    let span = f64::from(days.max(1));

    (0..days)
        .filter_map(|i| {
            let offset = u64::from(days - 1 - i);
            let day = end_day.checked_sub_days(Days::new(offset))?;
            let t = f64::from(i);
            let drift = 1.0 + 0.5 * t / span;
            let cycle = 1.0 + 0.12 * (t / 45.0 + phase).sin() + 0.04 * (t / 6.5 + 2.0 * phase).sin();
            Some(PricePoint::new(day, base * drift * cycle))
        })
        .collect()
}
