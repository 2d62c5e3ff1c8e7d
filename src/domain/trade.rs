use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::position::{OpenPosition, Position};
use crate::domain::signal::ExitReason;

/// Prices of both legs on one bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePair {
    pub a: f64,
    pub b: f64,
}

/// A completed Flat -> Long/Short -> Flat round trip. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: u64,
    pub side: Position,
    pub entry_index: usize,
    pub exit_index: usize,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub entry_prices: PricePair,
    pub exit_prices: PricePair,
    /// Hedge ratio fixed at entry
    pub hedge_ratio: f64,
    pub exit_reason: ExitReason,
    /// Direction-adjusted spread change, before costs
    pub gross_pnl: f64,
    /// Round-trip transaction costs
    pub costs: f64,
    /// Realized P&L net of costs
    pub net_pnl: f64,
    /// Net P&L over entry notional (fraction, not percent)
    pub return_pct: f64,
}

impl TradeRecord {
    pub fn bars_held(&self) -> usize {
        self.exit_index - self.entry_index
    }

    pub fn is_win(&self) -> bool {
        self.net_pnl > 0.0
    }
}

impl fmt::Display for TradeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} {} -> {} beta={:.4} net={:.4} ({:.2}%) {}",
            self.id,
            self.side,
            self.entry_time.format("%Y-%m-%d"),
            self.exit_time.format("%Y-%m-%d"),
            self.hedge_ratio,
            self.net_pnl,
            self.return_pct * 100.0,
            self.exit_reason
        )
    }
}

/// Position still open when the series ended
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpenTrade {
    pub position: OpenPosition,
    pub entry_time: DateTime<Utc>,
    /// Mark-to-market on the last bar, before exit costs
    pub unrealized_pnl: f64,
}

/// Ordered record of closed trades plus at most one open position
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeLog {
    trades: Vec<TradeRecord>,
    open: Option<OpenTrade>,
}

impl TradeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, trade: TradeRecord) {
        self.trades.push(trade);
    }

    pub(crate) fn set_open(&mut self, open: Option<OpenTrade>) {
        self.open = open;
    }

    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    pub fn open_trade(&self) -> Option<&OpenTrade> {
        self.open.as_ref()
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    pub fn total_net_pnl(&self) -> f64 {
        self.trades.iter().map(|t| t.net_pnl).sum()
    }

    pub fn trades_by_reason(&self, reason: ExitReason) -> Vec<&TradeRecord> {
        self.trades.iter().filter(|t| t.exit_reason == reason).collect()
    }
}
