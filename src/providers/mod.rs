pub mod binance;
pub mod fallback;
pub mod history;
pub mod util;
pub mod yahoo_finance;

pub use history::HistoryProvider;
