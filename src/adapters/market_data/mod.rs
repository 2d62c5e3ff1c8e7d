//! Market Data Adapters
//!
//! File-based price input and result export:
//! - `load_price_pair`: aligned `timestamp,price_a,price_b` CSV into two series
//! - `save_trades`: closed trades as CSV
//! - `save_report_json`: the full analysis report as JSON

mod csv_prices;

pub use csv_prices::{
    load_price_pair, save_price_pair, save_report_json, save_trades, PriceFileError, PriceRow,
    TradeRow,
};
