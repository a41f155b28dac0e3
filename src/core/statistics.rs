//! Aggregate metrics over a completed simulation's purchases.
use crate::core::simulation::Transaction;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PurchaseStatistics {
    pub purchase_count: usize,
    /// Cost basis per unit, `total_invested / total_units`.
    pub average_purchase_price: f64,
    /// Lowest price paid.
    pub best_purchase_price: f64,
    /// Highest price paid.
    pub worst_purchase_price: f64,
}

/// Derives purchase metrics from a transaction list.
///
/// An empty list yields all-zero statistics.
pub fn summarize(
    transactions: &[Transaction],
    total_invested: f64,
    total_units: f64,
) -> PurchaseStatistics {
    if transactions.is_empty() {
        return PurchaseStatistics::default();
    }

    let (best, worst) = transactions.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY),
        |(best, worst), tx| (best.min(tx.price), worst.max(tx.price)),
    );

    let average = if total_units > 0.0 {
        total_invested / total_units
    } else {
        0.0
    };

    PurchaseStatistics {
        purchase_count: transactions.len(),
        average_purchase_price: average,
        best_purchase_price: best,
        worst_purchase_price: worst,
    }
}
