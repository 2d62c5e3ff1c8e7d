//! Backtest Engine
//!
//! Replays signal transitions against the aligned prices, fills each leg at
//! the bar close, charges transaction costs on both fills and records every
//! completed round trip in the trade log.
//!
//! The engine trusts nothing about the transition stream: any disagreement
//! with its own view of the open position is an `InconsistentState` error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::application::performance::PerformanceSummary;
use crate::domain::{
    notional, ExitReason, OpenPosition, OpenTrade, PairsError, PricePair, PriceSeries, TradeLog,
    TradeRecord, Transition,
};

/// Everything produced by one backtest run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestOutput {
    pub trade_log: TradeLog,
    pub performance: PerformanceSummary,
    /// Mark-to-market net P&L after each bar
    pub equity_curve: Vec<f64>,
    /// Distance of the equity curve below its running peak (<= 0)
    pub drawdown: Vec<f64>,
}

struct ActiveTrade {
    position: OpenPosition,
    entry_time: DateTime<Utc>,
    entry_cost: f64,
}

/// Run the backtest.
///
/// `transaction_cost_pct` is in percent of notional per fill.
pub fn run(
    price_a: &PriceSeries,
    price_b: &PriceSeries,
    transitions: &[Transition],
    transaction_cost_pct: f64,
) -> Result<BacktestOutput, PairsError> {
    price_a.check_aligned(price_b)?;
    let len = price_a.len();
    let a = price_a.prices();
    let b = price_b.prices();
    let cost_rate = transaction_cost_pct / 100.0;

    let mut log = TradeLog::new();
    let mut active: Option<ActiveTrade> = None;
    let mut next_id = 1u64;
    let mut realized = 0.0;
    let mut equity_curve = Vec::with_capacity(len);
    let mut pending = transitions.iter().peekable();
    let mut last_index: Option<usize> = None;

    for t in 0..len {
        while let Some(transition) = pending.next_if(|tr| tr.index == t) {
            if last_index == Some(t) {
                return Err(PairsError::InconsistentState(format!(
                    "more than one transition on bar {}",
                    t
                )));
            }
            last_index = Some(t);

            if transition.is_entry() {
                if let Some(open) = &active {
                    return Err(PairsError::InconsistentState(format!(
                        "entry {} while {} position from bar {} is open",
                        transition, open.position.side, open.position.entry_index
                    )));
                }
                let entry_cost = cost_rate * notional(a[t], b[t], transition.hedge_ratio);
                active = Some(ActiveTrade {
                    position: OpenPosition {
                        side: transition.to,
                        entry_index: t,
                        entry_price_a: a[t],
                        entry_price_b: b[t],
                        hedge_ratio: transition.hedge_ratio,
                    },
                    entry_time: price_a.timestamps()[t],
                    entry_cost,
                });
                tracing::debug!(%transition, "Opened spread position");
            } else if transition.is_exit() {
                let open = active.take().ok_or_else(|| {
                    PairsError::InconsistentState(format!("exit {} with no open position", transition))
                })?;
                if open.position.side != transition.from {
                    return Err(PairsError::InconsistentState(format!(
                        "exit {} but open position is {}",
                        transition, open.position.side
                    )));
                }
                let reason = transition.exit_reason.ok_or_else(|| {
                    PairsError::InconsistentState(format!("exit {} has no reason", transition))
                })?;

                let exit = PricePair { a: a[t], b: b[t] };
                let record = close_trade(
                    next_id,
                    &open,
                    t,
                    price_a.timestamps()[t],
                    exit,
                    reason,
                    cost_rate,
                );
                next_id += 1;
                realized += record.net_pnl;
                tracing::debug!(trade = %record, "Closed spread position");
                log.push(record);
            } else {
                return Err(PairsError::InconsistentState(format!(
                    "transition {} is neither an entry nor an exit",
                    transition
                )));
            }
        }

        let open_value = active
            .as_ref()
            .map(|open| open.position.unrealized_pnl(a[t], b[t]) - open.entry_cost)
            .unwrap_or(0.0);
        equity_curve.push(realized + open_value);
    }

    if let Some(stray) = pending.next() {
        return Err(PairsError::InconsistentState(format!(
            "transition {} is out of order or beyond the {} bar series",
            stray, len
        )));
    }

    if let (Some(open), Some(&last_a), Some(&last_b)) = (&active, a.last(), b.last()) {
        log.set_open(Some(OpenTrade {
            position: open.position,
            entry_time: open.entry_time,
            unrealized_pnl: open.position.unrealized_pnl(last_a, last_b),
        }));
    }

    let drawdown = drawdown_series(&equity_curve);
    let performance = PerformanceSummary::from_log(&log);

    tracing::info!(
        trades = performance.trade_count,
        net_pnl = performance.total_net_pnl,
        open = log.open_trade().is_some(),
        "Backtest complete"
    );

    Ok(BacktestOutput {
        trade_log: log,
        performance,
        equity_curve,
        drawdown,
    })
}

fn close_trade(
    id: u64,
    open: &ActiveTrade,
    exit_index: usize,
    exit_time: DateTime<Utc>,
    exit_prices: PricePair,
    exit_reason: ExitReason,
    cost_rate: f64,
) -> TradeRecord {
    let position = &open.position;
    let gross_pnl = position.unrealized_pnl(exit_prices.a, exit_prices.b);
    let exit_cost = cost_rate * notional(exit_prices.a, exit_prices.b, position.hedge_ratio);
    let costs = open.entry_cost + exit_cost;
    let net_pnl = gross_pnl - costs;
    let entry_notional = position.entry_notional();
    let return_pct = if entry_notional > 0.0 {
        net_pnl / entry_notional
    } else {
        0.0
    };

    TradeRecord {
        id,
        side: position.side,
        entry_index: position.entry_index,
        exit_index,
        entry_time: open.entry_time,
        exit_time,
        entry_prices: PricePair {
            a: position.entry_price_a,
            b: position.entry_price_b,
        },
        exit_prices,
        hedge_ratio: position.hedge_ratio,
        exit_reason,
        gross_pnl,
        costs,
        net_pnl,
        return_pct,
    }
}

/// Equity minus its running maximum, starting from a zero peak
pub fn drawdown_series(equity: &[f64]) -> Vec<f64> {
    let mut peak = 0.0_f64;
    equity
        .iter()
        .map(|&e| {
            peak = peak.max(e);
            e - peak
        })
        .collect()
}
