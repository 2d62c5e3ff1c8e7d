//! Analysis Pipeline
//!
//! The single entry point that runs every stage in order:
//! prices -> hedge ratio -> spread / z-score -> signals -> backtest.
//! Each stage consumes the full output of the previous one. A failure at
//! any stage discards everything computed so far.

use serde::{Deserialize, Serialize};

use crate::application::backtest::{self, BacktestOutput};
use crate::application::performance::PerformanceSummary;
use crate::domain::{PairsError, Position, PriceSeries, TradeLog, Transition};
use crate::strategy::diagnostics;
use crate::strategy::hedge::{self, HedgeRatioEstimate};
use crate::strategy::params::AnalysisConfig;
use crate::strategy::spread;
use crate::strategy::state_machine;

/// Full output of one `analyze` run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub symbol_a: String,
    pub symbol_b: String,
    pub config: AnalysisConfig,
    pub hedge: HedgeRatioEstimate,
    pub spread: Vec<f64>,
    pub zscore: Vec<Option<f64>>,
    /// Position held after each bar
    pub positions: Vec<Position>,
    pub transitions: Vec<Transition>,
    pub trade_log: TradeLog,
    pub performance: PerformanceSummary,
    pub equity_curve: Vec<f64>,
    pub drawdown: Vec<f64>,
    /// Rolling correlation of the two price series over the z-score window
    pub correlation: Vec<Option<f64>>,
    /// Mean-reversion half-life of the spread in bars
    pub half_life: Option<f64>,
}

impl AnalysisReport {
    pub fn len(&self) -> usize {
        self.spread.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spread.is_empty()
    }

    /// Position after the last bar
    pub fn final_position(&self) -> Position {
        self.positions.last().copied().unwrap_or_default()
    }
}

/// Run the full pairs analysis on two aligned price series.
///
/// Configuration is validated before anything else; every violated
/// constraint is reported in one `InvalidConfiguration` error.
pub fn analyze(
    price_a: &PriceSeries,
    price_b: &PriceSeries,
    config: &AnalysisConfig,
) -> Result<AnalysisReport, PairsError> {
    config.validate()?;
    price_a.check_aligned(price_b)?;

    tracing::info!(
        pair = %format!("{}/{}", price_a.symbol(), price_b.symbol()),
        bars = price_a.len(),
        method = config.method.name(),
        entry_z = config.signal.entry_z,
        exit_z = config.signal.exit_z,
        window = config.signal.window,
        "Starting pairs analysis"
    );

    let hedge = hedge::estimate(&config.method, price_a, price_b)?;
    let spread = spread::spread(price_a, price_b, &hedge)?;
    let zscore = spread::zscore(&spread, config.signal.window)?;

    let signals = state_machine::generate_signals(price_a, price_b, &hedge, &zscore, config)?;
    let BacktestOutput {
        trade_log,
        performance,
        equity_curve,
        drawdown,
    } = backtest::run(
        price_a,
        price_b,
        &signals.transitions,
        config.risk.transaction_cost_pct,
    )?;

    let correlation =
        diagnostics::rolling_correlation(price_a.prices(), price_b.prices(), config.signal.window);
    let half_life = diagnostics::half_life(&spread);

    if let Some((beta, alpha)) = hedge.last() {
        tracing::info!(
            beta,
            alpha,
            half_life = ?half_life,
            transitions = signals.transitions.len(),
            trades = performance.trade_count,
            net_pnl = performance.total_net_pnl,
            "Pairs analysis complete"
        );
    }
    if trade_log.open_trade().is_some() {
        tracing::warn!("Position still open at end of series");
    }

    Ok(AnalysisReport {
        symbol_a: price_a.symbol().to_string(),
        symbol_b: price_b.symbol().to_string(),
        config: *config,
        hedge,
        spread,
        zscore,
        positions: signals.positions,
        transitions: signals.transitions,
        trade_log,
        performance,
        equity_curve,
        drawdown,
        correlation,
        half_life,
    })
}
