//! Performance Summary
//!
//! Aggregate statistics recomputed from a trade log. Nothing here is
//! updated incrementally; build a new summary whenever the log changes.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::fmt;

use crate::domain::TradeLog;

/// Dispersion below this makes the risk-adjusted ratio undefined
const MIN_RETURN_STD: f64 = 1e-10;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    /// Closed trades
    pub trade_count: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    /// Winning share of closed trades, 0-100
    pub win_rate: f64,
    pub total_gross_pnl: f64,
    pub total_costs: f64,
    pub total_net_pnl: f64,
    /// Compounded net return per unit of entry notional, as a fraction
    pub cumulative_return: f64,
    /// Largest peak-to-trough fall of the cumulative net P&L curve
    pub max_drawdown: f64,
    /// Largest peak-to-trough fall of the compounded return curve, percent
    pub max_drawdown_pct: f64,
    /// Mean trade return over its sample standard deviation
    pub risk_adjusted_ratio: Option<f64>,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    /// Gross profits over gross losses, `None` without losing trades
    pub profit_factor: Option<f64>,
    pub avg_bars_held: f64,
}

impl PerformanceSummary {
    pub fn from_log(log: &TradeLog) -> Self {
        let trades = log.trades();
        if trades.is_empty() {
            return Self::default();
        }

        let mut summary = Self {
            trade_count: trades.len(),
            ..Self::default()
        };

        let mut sum_wins = 0.0;
        let mut sum_losses = 0.0;
        let mut cumulative_pnl = 0.0_f64;
        let mut pnl_peak = 0.0_f64;
        let mut growth = 1.0_f64;
        let mut growth_peak = 1.0_f64;

        for trade in trades {
            let pnl = trade.net_pnl;
            summary.total_gross_pnl += trade.gross_pnl;
            summary.total_costs += trade.costs;
            summary.total_net_pnl += pnl;

            if pnl > 0.0 {
                summary.winning_trades += 1;
                sum_wins += pnl;
                summary.largest_win = summary.largest_win.max(pnl);
            } else if pnl < 0.0 {
                summary.losing_trades += 1;
                sum_losses += pnl;
                summary.largest_loss = summary.largest_loss.min(pnl);
            }

            cumulative_pnl += pnl;
            pnl_peak = pnl_peak.max(cumulative_pnl);
            summary.max_drawdown = summary.max_drawdown.max(pnl_peak - cumulative_pnl);

            growth *= 1.0 + trade.return_pct;
            growth_peak = growth_peak.max(growth);
            if growth_peak > 0.0 {
                let dd = (growth_peak - growth) / growth_peak * 100.0;
                summary.max_drawdown_pct = summary.max_drawdown_pct.max(dd);
            }
        }

        summary.win_rate = summary.winning_trades as f64 / summary.trade_count as f64 * 100.0;
        summary.cumulative_return = growth - 1.0;
        if summary.winning_trades > 0 {
            summary.avg_win = sum_wins / summary.winning_trades as f64;
        }
        if summary.losing_trades > 0 {
            summary.avg_loss = sum_losses / summary.losing_trades as f64;
            summary.profit_factor = Some(sum_wins / sum_losses.abs());
        }
        summary.avg_bars_held =
            trades.iter().map(|t| t.bars_held() as f64).sum::<f64>() / trades.len() as f64;
        summary.risk_adjusted_ratio = risk_adjusted_ratio(trades.iter().map(|t| t.return_pct));

        summary
    }

    /// Risk-adjusted ratio formatted for display, "n/a" when undefined
    pub fn risk_adjusted_display(&self) -> String {
        self.risk_adjusted_ratio
            .map(|r| format!("{:.3}", r))
            .unwrap_or_else(|| "n/a".to_string())
    }
}

fn risk_adjusted_ratio(returns: impl Iterator<Item = f64>) -> Option<f64> {
    let returns: Vec<f64> = returns.collect();
    if returns.len() < 2 {
        return None;
    }
    let mean = returns.iter().copied().mean();
    let std_dev = returns.iter().copied().std_dev();
    if !std_dev.is_finite() || std_dev < MIN_RETURN_STD {
        return None;
    }
    Some(mean / std_dev)
}

impl fmt::Display for PerformanceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Trades:            {}", self.trade_count)?;
        writeln!(
            f,
            "Win rate:          {:.1}% ({}W / {}L)",
            self.win_rate, self.winning_trades, self.losing_trades
        )?;
        writeln!(f, "Net P&L:           {:.4}", self.total_net_pnl)?;
        writeln!(f, "Costs:             {:.4}", self.total_costs)?;
        writeln!(f, "Cumulative return: {:.3}%", self.cumulative_return * 100.0)?;
        writeln!(
            f,
            "Max drawdown:      {:.4} ({:.3}%)",
            self.max_drawdown, self.max_drawdown_pct
        )?;
        write!(f, "Risk-adjusted:     {}", self.risk_adjusted_display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExitReason, Position, PricePair, TradeRecord};
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone, Utc};

    fn trade(id: u64, net_pnl: f64, return_pct: f64) -> TradeRecord {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        TradeRecord {
            id,
            side: Position::Long,
            entry_index: 0,
            exit_index: 4,
            entry_time: start,
            exit_time: start + Duration::days(4),
            entry_prices: PricePair { a: 100.0, b: 50.0 },
            exit_prices: PricePair { a: 101.0, b: 50.0 },
            hedge_ratio: 2.0,
            exit_reason: ExitReason::ZScoreReversion,
            gross_pnl: net_pnl + 0.2,
            costs: 0.2,
            net_pnl,
            return_pct,
        }
    }

    fn log_of(trades: Vec<TradeRecord>) -> TradeLog {
        let mut log = TradeLog::new();
        for t in trades {
            log.push(t);
        }
        log
    }

    #[test]
    fn test_empty_log() {
        let summary = PerformanceSummary::from_log(&TradeLog::new());
        assert_eq!(summary.trade_count, 0);
        assert_eq!(summary.win_rate, 0.0);
        assert!(summary.risk_adjusted_ratio.is_none());
        assert_eq!(summary.risk_adjusted_display(), "n/a");
    }

    #[test]
    fn test_single_trade_has_no_ratio() {
        let summary = PerformanceSummary::from_log(&log_of(vec![trade(1, 1.0, 0.01)]));
        assert_eq!(summary.trade_count, 1);
        assert_eq!(summary.win_rate, 100.0);
        assert!(summary.risk_adjusted_ratio.is_none());
        assert!(summary.profit_factor.is_none());
    }

    #[test]
    fn test_mixed_trades() {
        let log = log_of(vec![
            trade(1, 2.0, 0.02),
            trade(2, -1.0, -0.01),
            trade(3, -2.0, -0.02),
            trade(4, 3.0, 0.03),
        ]);
        let summary = PerformanceSummary::from_log(&log);

        assert_eq!(summary.winning_trades, 2);
        assert_eq!(summary.losing_trades, 2);
        assert_relative_eq!(summary.win_rate, 50.0);
        assert_relative_eq!(summary.total_net_pnl, 2.0);
        assert_relative_eq!(summary.total_costs, 0.8, epsilon = 1e-12);
        // Curve 2, 1, -1, 2: peak 2, trough -1
        assert_relative_eq!(summary.max_drawdown, 3.0);
        assert_relative_eq!(summary.avg_win, 2.5);
        assert_relative_eq!(summary.avg_loss, -1.5);
        assert_relative_eq!(summary.largest_win, 3.0);
        assert_relative_eq!(summary.largest_loss, -2.0);
        assert_relative_eq!(summary.profit_factor.unwrap(), 5.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(summary.avg_bars_held, 4.0);

        let growth = 1.02 * 0.99 * 0.98 * 1.03;
        assert_relative_eq!(summary.cumulative_return, growth - 1.0, epsilon = 1e-12);
        let dd_pct = (1.02 - 1.02 * 0.99 * 0.98) / 1.02 * 100.0;
        assert_relative_eq!(summary.max_drawdown_pct, dd_pct, epsilon = 1e-9);

        // mean 0.005, sample std of [0.02, -0.01, -0.02, 0.03]
        let ratio = summary.risk_adjusted_ratio.unwrap();
        let std = (0.0017_f64 / 3.0).sqrt();
        assert_relative_eq!(ratio, 0.005 / std, epsilon = 1e-9);
    }

    #[test]
    fn test_identical_returns_have_no_ratio() {
        let log = log_of(vec![trade(1, 1.0, 0.01), trade(2, 1.0, 0.01)]);
        assert!(PerformanceSummary::from_log(&log).risk_adjusted_ratio.is_none());
    }

    #[test]
    fn test_display_reports_na() {
        let text = format!("{}", PerformanceSummary::from_log(&TradeLog::new()));
        assert!(text.contains("Trades:            0"));
        assert!(text.contains("n/a"));
    }
}
