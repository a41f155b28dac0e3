//! Core domain types and the simulation pipeline

pub mod cache;
pub mod comparison;
pub mod config;
pub mod debounce;
pub mod log;
pub mod price;
pub mod schedule;
pub mod simulation;
pub mod statistics;

// Re-export main types for cleaner imports
pub use comparison::{Comparison, ComparisonResults, compare_assets};
pub use price::{AssetId, HistorySource, PriceHistoryProvider, PricePoint, StandardAsset};
pub use schedule::{Frequency, ScheduleParameters};
pub use simulation::{InvestmentResult, Transaction, simulate};
pub use statistics::PurchaseStatistics;
