//! Adapters Layer - External System Implementations
//!
//! - CLI: Command-line interface handlers
//! - Market Data: aligned price CSV files and report export

pub mod cli;
pub mod market_data;

pub use cli::CliApp;
pub use market_data::{load_price_pair, save_report_json, save_trades, PriceFileError};
