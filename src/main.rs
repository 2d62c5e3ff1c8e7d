//! Butters Pairs - Statistical Arbitrage Analysis
//!
//! Hedge ratio estimation, z-score signals and a cost-aware backtest for a
//! pair of aligned price series.

use anyhow::Result;

use butters_pairs::adapters::cli;

fn main() -> Result<()> {
    // Load .env file if it exists (PAIRS_CONFIG, RUST_LOG)
    dotenvy::dotenv().ok();

    let app = cli::init();
    cli::execute(app)
}
