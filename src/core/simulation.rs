//! Replays a fixed-amount purchase schedule against a daily price series.
use crate::core::price::PricePoint;
use crate::core::schedule::ScheduleParameters;
use crate::core::statistics::{self, PurchaseStatistics};
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Transaction {
    pub day: NaiveDate,
    pub amount: f64,
    pub price: f64,
    pub units_bought: f64,
}

impl Transaction {
    pub fn new(day: NaiveDate, amount: f64, price: f64) -> Self {
        Self {
            day,
            amount,
            price,
            units_bought: amount / price,
        }
    }
}

/// Portfolio state at the close of one price observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimulationSnapshot {
    pub day: NaiveDate,
    pub cumulative_invested: f64,
    pub cumulative_value: f64,
    pub price: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InvestmentResult {
    pub total_invested: f64,
    pub current_value: f64,
    pub total_units_held: f64,
    pub roi_percent: f64,
    pub purchase_count: usize,
    pub average_purchase_price: f64,
    pub best_purchase_price: f64,
    pub worst_purchase_price: f64,
    pub transactions: Vec<Transaction>,
    pub history: Vec<SimulationSnapshot>,
}

impl InvestmentResult {
    pub fn statistics(&self) -> PurchaseStatistics {
        PurchaseStatistics {
            purchase_count: self.purchase_count,
            average_purchase_price: self.average_purchase_price,
            best_purchase_price: self.best_purchase_price,
            worst_purchase_price: self.worst_purchase_price,
        }
    }
}

/// Runs the dollar-cost averaging simulation.
///
/// Only points within `[start_date, end_date]` are considered. A purchase
/// fires on the first point on or after the purchase cursor, after which the
/// cursor moves one period forward from its own previous value, not from the
/// day the purchase happened on. After a long data gap the cursor can lag
/// behind, so several consecutive points may each trigger a purchase until it
/// catches up.
///
/// Dates are `NaiveDate`, so both bounds are already at day granularity.
pub fn simulate(prices: &[PricePoint], params: &ScheduleParameters) -> InvestmentResult {
    let start = params.start_date;
    let end = params.end_date;
    let amount = params.amount_per_purchase;

    let mut points: Vec<PricePoint> = prices
        .iter()
        .filter(|p| p.day >= start && p.day <= end)
        .copied()
        .collect();
    points.sort_by_key(|p| p.day);

    let Some(last) = points.last().copied() else {
        return InvestmentResult::default();
    };

    let mut cursor = start;
    let mut units_held = 0.0;
    let mut transactions = Vec::new();
    let mut history = Vec::with_capacity(points.len());

    for point in &points {
        if point.day >= cursor {
            let tx = Transaction::new(point.day, amount, point.price);
            units_held += tx.units_bought;
            transactions.push(tx);
            cursor = params.frequency.advance(cursor);
        }

        history.push(SimulationSnapshot {
            day: point.day,
            cumulative_invested: transactions.len() as f64 * amount,
            cumulative_value: units_held * point.price,
            price: point.price,
        });
    }

    let total_invested = transactions.len() as f64 * amount;
    let current_value = units_held * last.price;
    let roi_percent = if total_invested > 0.0 {
        (current_value - total_invested) / total_invested * 100.0
    } else {
        0.0
    };
    let stats = statistics::summarize(&transactions, total_invested, units_held);

    InvestmentResult {
        total_invested,
        current_value,
        total_units_held: units_held,
        roi_percent,
        purchase_count: stats.purchase_count,
        average_purchase_price: stats.average_purchase_price,
        best_purchase_price: stats.best_purchase_price,
        worst_purchase_price: stats.worst_purchase_price,
        transactions,
        history,
    }
}
